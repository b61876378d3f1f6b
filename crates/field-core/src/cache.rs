use ndarray::{s, Array2};
use num_complex::Complex64;
use std::collections::HashMap;
use tracing::debug;

/// Identifies one response table. Frequency and phase are matched by exact
/// bit pattern; `-0.0` is folded into `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    frequency_bits: u64,
    z_offset: usize,
    phase_bits: u64,
}

fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

impl CacheKey {
    pub fn new(frequency: f64, z_offset: usize, phase: f64) -> Self {
        Self {
            frequency_bits: canonical_bits(frequency),
            z_offset,
            phase_bits: canonical_bits(phase),
        }
    }

    pub fn frequency(&self) -> f64 {
        f64::from_bits(self.frequency_bits)
    }

    pub fn z_offset(&self) -> usize {
        self.z_offset
    }

    pub fn phase(&self) -> f64 {
        f64::from_bits(self.phase_bits)
    }
}

/// Response tables of shape `(2·sx − 1, 2·sy − 1)`, indexed by
/// `[Δx + sx − 1, Δy + sy − 1]` with `Δ = receiver − source`.
///
/// For a fixed frequency, phase and `|Δz|` the response depends only on
/// `|Δx|` and `|Δy|`, so one quadrant is computed and reflected across
/// both horizontal axes.
#[derive(Debug, Clone, Default)]
pub struct TransferCache {
    entries: HashMap<CacheKey, Array2<Complex64>>,
}

impl TransferCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Full response table for `key`, if built.
    pub fn table(&self, key: &CacheKey) -> Option<&Array2<Complex64>> {
        self.entries.get(key)
    }

    /// Build the table for `key` over horizontal extent `[sx, sy]`, where
    /// `response(r)` is the pressure at distance `r`. Returns `false` if the
    /// table already existed.
    pub fn build<F>(&mut self, key: CacheKey, extent: [usize; 2], response: F) -> bool
    where
        F: Fn(f64) -> Complex64,
    {
        if self.entries.contains_key(&key) {
            return false;
        }
        let [sx, sy] = extent;
        let dz = key.z_offset as f64;
        let quadrant = Array2::from_shape_fn((sx, sy), |(dx, dy)| {
            let (dx, dy) = (dx as f64, dy as f64);
            response((dx * dx + dy * dy + dz * dz).sqrt())
        });
        let table = reflect_quadrant(&quadrant);
        debug!(
            frequency = key.frequency(),
            z_offset = key.z_offset,
            phase = key.phase(),
            shape = ?table.dim(),
            "built transfer table"
        );
        self.entries.insert(key, table);
        true
    }

    /// Cached pressure for horizontal displacement `(dx, dy)`, or `None` if
    /// the table is missing or the displacement falls outside it.
    pub fn lookup(&self, key: &CacheKey, dx: i64, dy: i64) -> Option<Complex64> {
        let table = self.entries.get(key)?;
        let (nx, ny) = table.dim();
        let ix = dx + (nx as i64 - 1) / 2;
        let iy = dy + (ny as i64 - 1) / 2;
        if ix < 0 || iy < 0 {
            return None;
        }
        table.get((ix as usize, iy as usize)).copied()
    }
}

/// Expand a `(sx, sy)` quadrant indexed by `(|Δx|, |Δy|)` into a
/// `(2·sx − 1, 2·sy − 1)` table centred on zero displacement.
fn reflect_quadrant(quadrant: &Array2<Complex64>) -> Array2<Complex64> {
    let (sx, sy) = quadrant.dim();
    let mut table = Array2::zeros((2 * sx - 1, 2 * sy - 1));
    table.slice_mut(s![sx - 1.., sy - 1..]).assign(quadrant);
    table
        .slice_mut(s![..sx, sy - 1..])
        .assign(&quadrant.slice(s![..;-1, ..]));
    table
        .slice_mut(s![sx - 1.., ..sy])
        .assign(&quadrant.slice(s![.., ..;-1]));
    table
        .slice_mut(s![..sx, ..sy])
        .assign(&quadrant.slice(s![..;-1, ..;-1]));
    table
}
