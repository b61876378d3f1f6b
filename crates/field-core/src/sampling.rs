use crate::GridPoint;
use ndarray::Array3;
use serde::Serialize;
use std::f64::consts::PI;

/// Angular steps over `[0, π]` taken by [`arc`].
pub const ARC_STEPS: usize = 1800;
/// Azimuth steps over `[0, 2π]` taken by [`hemisphere`].
pub const HEMISPHERE_AZIMUTH_STEPS: usize = 100;
/// Polar steps over `[0, π/2]` taken by [`hemisphere`].
pub const HEMISPHERE_POLAR_STEPS: usize = 50;

/// One point of a semicircular arc together with the angle that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArcSample {
    /// Angle in radians, measured from +x towards +z.
    pub angle: f64,
    pub point: GridPoint,
}

/// `n` evenly spaced values from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n - 1).map(|i| start + i as f64 * step).collect();
            values.push(end);
            values
        }
    }
}

fn clip(x: i64, y: i64, z: i64, size: [usize; 3]) -> Option<GridPoint> {
    let inside = |v: i64, n: usize| v >= 0 && (v as u64) < n as u64;
    if inside(x, size[0]) && inside(y, size[1]) && inside(z, size[2]) {
        Some(GridPoint::new(x as usize, y as usize, z as usize))
    } else {
        None
    }
}

/// Offset of `center` by a real-valued displacement, truncated toward zero.
fn offset(center: i64, delta: f64) -> i64 {
    center + delta.trunc() as i64
}

/// Every cell in the plane `z = center.z` whose squared distance from
/// `center` is at most `radius²`, clipped to the field. Ordered with x as
/// the outer loop.
pub fn filled_disc(center: GridPoint, radius: usize, size: [usize; 3]) -> Vec<GridPoint> {
    let (cx, cy, cz) = (center.x as i64, center.y as i64, center.z as i64);
    // A radius past i64::MAX already covers the whole plane.
    let r = i64::try_from(radius).unwrap_or(i64::MAX);
    let r2 = i128::from(r) * i128::from(r);
    let span = |c: i64, n: usize| {
        let last = i64::try_from(n).unwrap_or(i64::MAX) - 1;
        (c.saturating_sub(r).max(0), c.saturating_add(r).min(last))
    };
    let (x_lo, x_hi) = span(cx, size[0]);
    let (y_lo, y_hi) = span(cy, size[1]);

    let mut points = Vec::new();
    for x in x_lo..=x_hi {
        for y in y_lo..=y_hi {
            let (dx, dy) = (i128::from(x - cx), i128::from(y - cy));
            if dx * dx + dy * dy <= r2 {
                if let Some(p) = clip(x, y, cz, size) {
                    points.push(p);
                }
            }
        }
    }
    points
}

/// Semicircular arc of radius `radius` in the x–z plane through `center`,
/// one sample per angle for [`ARC_STEPS`] angles over `[0, π]`. Samples
/// outside the field are dropped; rounding can repeat a cell.
pub fn arc(center: GridPoint, radius: f64, size: [usize; 3]) -> Vec<ArcSample> {
    let (cx, cy, cz) = (center.x as i64, center.y as i64, center.z as i64);
    linspace(0.0, PI, ARC_STEPS)
        .into_iter()
        .filter_map(|angle| {
            let x = offset(cx, radius * angle.cos());
            let z = offset(cz, radius * angle.sin());
            clip(x, cy, z, size).map(|point| ArcSample { angle, point })
        })
        .collect()
}

/// Cells on the upper (`+z`) hemisphere of radius `radius` around `center`,
/// each listed once, in `(x, y, z)` lexicographic order.
pub fn hemisphere(center: GridPoint, radius: f64, size: [usize; 3]) -> Vec<GridPoint> {
    let (cx, cy, cz) = (center.x as i64, center.y as i64, center.z as i64);
    let mut volume = Array3::from_elem((size[0], size[1], size[2]), false);

    let polar = linspace(0.0, PI / 2.0, HEMISPHERE_POLAR_STEPS);
    for theta in linspace(0.0, 2.0 * PI, HEMISPHERE_AZIMUTH_STEPS) {
        for &phi in &polar {
            let x = offset(cx, radius * phi.sin() * theta.cos());
            let y = offset(cy, radius * phi.sin() * theta.sin());
            let z = offset(cz, radius * phi.cos());
            if let Some(p) = clip(x, y, z, size) {
                volume[[p.x, p.y, p.z]] = true;
            }
        }
    }

    volume
        .indexed_iter()
        .filter(|(_, &marked)| marked)
        .map(|((x, y, z), _)| GridPoint::new(x, y, z))
        .collect()
}
