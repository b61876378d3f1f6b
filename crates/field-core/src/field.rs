use crate::cache::{CacheKey, TransferCache};
use crate::error::{FieldError, Result};
use crate::{monopole, sampling, FieldConfig, GridPoint, Point3D};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A single point source at a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Monopole {
    pub position: GridPoint,
    /// Frequency in Hz.
    pub frequency: f64,
}

impl Monopole {
    pub fn new(position: GridPoint, frequency: f64) -> Self {
        Self {
            position,
            frequency,
        }
    }
}

/// A batch of sources to place in a [`Field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// Individual monopoles. Overwriting an occupied cell is reported.
    Monopoles { sources: Vec<Monopole> },
    /// Horizontal rectangle `[start.x, end.x) × [start.y, end.y)` in the
    /// plane `z`. Overwrites are silent.
    RectangularPiston {
        start: [usize; 2],
        end: [usize; 2],
        z: usize,
        frequency: f64,
    },
    /// Solid horizontal disc of cells within `radius` of `center` in the
    /// plane `z`, boundary included. Overwriting an occupied cell is reported.
    CircularPiston {
        center: [usize; 2],
        z: usize,
        radius: usize,
        frequency: f64,
    },
}

/// One occupied cell replaced during a placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overwrite {
    pub point: GridPoint,
    pub previous: f64,
    pub frequency: f64,
}

/// Outcome of [`Field::place`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub cells_written: usize,
    pub overwritten: Vec<Overwrite>,
}

/// Source positions and frequencies, in the form a renderer consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceCloud {
    pub points: Vec<GridPoint>,
    pub frequencies: Vec<f64>,
}

/// Overrides for [`Field::far_field_pressure`]. `None` falls back to the
/// field's own amplitude, speed of sound, single source frequency, and
/// geometric centre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarField {
    pub amplitude: Option<f64>,
    pub frequency: Option<f64>,
    pub speed_of_sound: Option<f64>,
    pub center: Option<Point3D>,
}

/// Pressure model used by [`Field::arc_pressure_profile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcMode {
    #[default]
    Exact,
    FarField,
}

/// A bounded 3D grid of monopole sources radiating into free space.
#[derive(Debug, Clone)]
pub struct Field {
    size: [usize; 3],
    speed_of_sound: f64,
    amplitude: f64,
    sources: BTreeMap<GridPoint, f64>,
    cache: TransferCache,
}

impl Field {
    pub fn new(config: FieldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            size: config.size,
            speed_of_sound: config.speed_of_sound,
            amplitude: config.amplitude,
            sources: BTreeMap::new(),
            cache: TransferCache::new(),
        })
    }

    /// Create a field and place an initial batch of sources.
    pub fn with_sources(config: FieldConfig, descriptor: &SourceDescriptor) -> Result<Self> {
        let mut field = Self::new(config)?;
        field.place(descriptor)?;
        Ok(field)
    }

    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    pub fn speed_of_sound(&self) -> f64 {
        self.speed_of_sound
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn config(&self) -> FieldConfig {
        FieldConfig {
            size: self.size,
            speed_of_sound: self.speed_of_sound,
            amplitude: self.amplitude,
        }
    }

    /// Geometric centre `(sx/2, sy/2, sz/2)`.
    pub fn center(&self) -> Point3D {
        Point3D::new(
            self.size[0] as f64 / 2.0,
            self.size[1] as f64 / 2.0,
            self.size[2] as f64 / 2.0,
        )
    }

    pub fn contains(&self, point: GridPoint) -> bool {
        point.x < self.size[0] && point.y < self.size[1] && point.z < self.size[2]
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Frequency of the source at `point`, if any.
    pub fn frequency_at(&self, point: GridPoint) -> Option<f64> {
        self.sources.get(&point).copied()
    }

    /// All sources in `(x, y, z)` order.
    pub fn sources(&self) -> impl Iterator<Item = (GridPoint, f64)> + '_ {
        self.sources.iter().map(|(&p, &f)| (p, f))
    }

    /// Distinct source frequencies, ascending.
    pub fn frequencies(&self) -> Vec<f64> {
        let mut frequencies: Vec<f64> = self.sources.values().copied().collect();
        frequencies.sort_by(f64::total_cmp);
        frequencies.dedup();
        frequencies
    }

    pub fn source_cloud(&self) -> SourceCloud {
        let (points, frequencies) = self.sources().unzip();
        SourceCloud {
            points,
            frequencies,
        }
    }

    pub fn cache(&self) -> &TransferCache {
        &self.cache
    }

    /// Drop every transfer table. Tables are not invalidated by later
    /// placements, so call this after changing sources that were cached.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Place a batch of sources. The whole batch is bounds-checked before
    /// any cell is written.
    pub fn place(&mut self, descriptor: &SourceDescriptor) -> Result<Placement> {
        let mut placement = Placement::default();
        match descriptor {
            SourceDescriptor::Monopoles { sources } => {
                for source in sources {
                    check_frequency(source.frequency)?;
                    self.check_bounds(source.position.x, source.position.y, source.position.z)?;
                }
                for source in sources {
                    self.set_source(source.position, source.frequency, true, &mut placement);
                }
            }
            &SourceDescriptor::RectangularPiston {
                start,
                end,
                z,
                frequency,
            } => {
                check_frequency(frequency)?;
                if start[0] >= end[0] || start[1] >= end[1] {
                    return Ok(placement);
                }
                self.check_bounds(start[0], start[1], z)?;
                self.check_bounds(end[0] - 1, end[1] - 1, z)?;
                for x in start[0]..end[0] {
                    for y in start[1]..end[1] {
                        self.set_source(GridPoint::new(x, y, z), frequency, false, &mut placement);
                    }
                }
            }
            &SourceDescriptor::CircularPiston {
                center,
                z,
                radius,
                frequency,
            } => {
                check_frequency(frequency)?;
                let (cx, cy) = (center[0] as i64, center[1] as i64);
                let r = i64::try_from(radius).map_err(|_| FieldError::OutOfBounds {
                    point: [i64::MAX, cy, z as i64],
                    size: self.size,
                })?;
                // Saturated extremes stay outside any field, so they fail the check.
                for (x, y) in [
                    (cx.saturating_sub(r), cy),
                    (cx.saturating_add(r), cy),
                    (cx, cy.saturating_sub(r)),
                    (cx, cy.saturating_add(r)),
                ] {
                    self.check_signed_bounds(x, y, z as i64)?;
                }
                let disc = sampling::filled_disc(GridPoint::new(center[0], center[1], z), radius, self.size);
                for point in disc {
                    self.set_source(point, frequency, true, &mut placement);
                }
            }
        }
        debug!(
            cells = placement.cells_written,
            overwritten = placement.overwritten.len(),
            total = self.sources.len(),
            "placed sources"
        );
        Ok(placement)
    }

    fn set_source(&mut self, point: GridPoint, frequency: f64, report: bool, placement: &mut Placement) {
        if let Some(previous) = self.sources.insert(point, frequency) {
            if report {
                warn!(?point, previous, frequency, "sound source overwritten");
                placement.overwritten.push(Overwrite {
                    point,
                    previous,
                    frequency,
                });
            }
        }
        placement.cells_written += 1;
    }

    fn check_bounds(&self, x: usize, y: usize, z: usize) -> Result<()> {
        if self.contains(GridPoint::new(x, y, z)) {
            Ok(())
        } else {
            Err(FieldError::OutOfBounds {
                point: [x as i64, y as i64, z as i64],
                size: self.size,
            })
        }
    }

    fn check_signed_bounds(&self, x: i64, y: i64, z: i64) -> Result<()> {
        if x < 0 || y < 0 || z < 0 {
            return Err(FieldError::OutOfBounds {
                point: [x, y, z],
                size: self.size,
            });
        }
        self.check_bounds(x as usize, y as usize, z as usize)
    }

    // -----------------------------------------------------------------------
    // Pressure queries
    // -----------------------------------------------------------------------

    /// Pressure at `receiver` from one source, served from the transfer
    /// cache when a matching table exists.
    fn source_pressure(&self, source: GridPoint, frequency: f64, receiver: GridPoint, phase: f64) -> Complex64 {
        if !self.cache.is_empty() {
            let key = CacheKey::new(frequency, source.z.abs_diff(receiver.z), phase);
            let dx = receiver.x as i64 - source.x as i64;
            let dy = receiver.y as i64 - source.y as i64;
            if let Some(p) = self.cache.lookup(&key, dx, dy) {
                return p;
            }
        }
        monopole::pressure(
            source.to_point(),
            receiver.to_point(),
            self.amplitude,
            frequency,
            self.speed_of_sound,
            phase,
        )
    }

    /// Superposed pressure of every source at `receiver`, each delayed by
    /// `phase` radians.
    pub fn total_pressure(&self, receiver: GridPoint, phase: f64) -> Complex64 {
        self.sources
            .iter()
            .map(|(&source, &frequency)| self.source_pressure(source, frequency, receiver, phase))
            .sum()
    }

    /// [`Field::total_pressure`], building any transfer table it is missing
    /// first.
    pub fn total_pressure_building_cache(&mut self, receiver: GridPoint, phase: f64) -> Complex64 {
        let pending: Vec<(f64, usize)> = self
            .sources
            .iter()
            .map(|(source, &frequency)| (frequency, source.z.abs_diff(receiver.z)))
            .filter(|&(frequency, z_offset)| !self.cache.contains(&CacheKey::new(frequency, z_offset, phase)))
            .collect();
        for (frequency, z_offset) in pending {
            self.build_cache(frequency, z_offset, phase);
        }
        self.total_pressure(receiver, phase)
    }

    /// Superposed pressure at an arbitrary position. Bypasses the cache.
    pub fn pressure_at(&self, receiver: Point3D, phase: f64) -> Complex64 {
        self.sources
            .iter()
            .map(|(source, &frequency)| {
                monopole::pressure(
                    source.to_point(),
                    receiver,
                    self.amplitude,
                    frequency,
                    self.speed_of_sound,
                    phase,
                )
            })
            .sum()
    }

    /// [`Field::total_pressure`] for each point of `points`.
    pub fn pressures(&self, points: &[GridPoint], phase: f64) -> Vec<Complex64> {
        points.iter().map(|&p| self.total_pressure(p, phase)).collect()
    }

    /// Build the transfer table for sources of `frequency` at vertical
    /// offset `z_offset` from the receiver. Returns `false` if it existed.
    pub fn build_cache(&mut self, frequency: f64, z_offset: usize, phase: f64) -> bool {
        let (amplitude, c) = (self.amplitude, self.speed_of_sound);
        self.cache.build(
            CacheKey::new(frequency, z_offset, phase),
            [self.size[0], self.size[1]],
            |r| monopole::pressure_at_distance(r, amplitude, frequency, c, phase),
        )
    }

    /// Order-of-magnitude pressure far from a source array: one monopole at
    /// the reference centre, scaled by the number of sources.
    ///
    /// Only meaningful when every source shares one frequency and the
    /// receiver is far from the array compared with its extent. Without an
    /// explicit frequency the field must hold sources of exactly one
    /// frequency.
    pub fn far_field_pressure(&self, receiver: Point3D, options: &FarField) -> Result<Complex64> {
        let frequency = match options.frequency {
            Some(f) => f,
            None => self.single_frequency()?,
        };
        let amplitude = options.amplitude.unwrap_or(self.amplitude);
        let c = options.speed_of_sound.unwrap_or(self.speed_of_sound);
        let center = options.center.unwrap_or_else(|| self.center());

        let p = monopole::pressure(center, receiver, amplitude, frequency, c, 0.0);
        Ok(p * self.sources.len() as f64)
    }

    fn single_frequency(&self) -> Result<f64> {
        let frequencies = self.frequencies();
        match frequencies.as_slice() {
            [] => Err(FieldError::EmptyField),
            [f] => Ok(*f),
            _ => Err(FieldError::MixedFrequencies { frequencies }),
        }
    }

    /// `(angle, |p|)` along a semicircular arc around `center`.
    pub fn arc_pressure_profile(&self, center: GridPoint, radius: f64, mode: ArcMode) -> Result<Vec<(f64, f64)>> {
        let samples = sampling::arc(center, radius, self.size);
        match mode {
            ArcMode::Exact => Ok(samples
                .iter()
                .map(|s| (s.angle, self.total_pressure(s.point, 0.0).norm()))
                .collect()),
            ArcMode::FarField => {
                let options = FarField::default();
                samples
                    .iter()
                    .map(|s| {
                        let p = self.far_field_pressure(s.point.to_point(), &options)?;
                        Ok((s.angle, p.norm()))
                    })
                    .collect()
            }
        }
    }
}

fn check_frequency(frequency: f64) -> Result<()> {
    if frequency.is_finite() {
        Ok(())
    } else {
        Err(FieldError::InvalidFrequency(frequency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn field(size: [usize; 3]) -> Field {
        Field::new(FieldConfig::new(size)).unwrap()
    }

    fn monopoles(list: &[((usize, usize, usize), f64)]) -> SourceDescriptor {
        SourceDescriptor::Monopoles {
            sources: list
                .iter()
                .map(|&(p, f)| Monopole::new(p.into(), f))
                .collect(),
        }
    }

    #[test]
    fn test_single_source_matches_monopole_model() {
        let mut f = field([10, 10, 10]);
        f.place(&monopoles(&[((5, 5, 0), 100.0)])).unwrap();

        let got = f.total_pressure(GridPoint::new(5, 5, 5), 0.0);
        let expected = monopole::pressure(
            Point3D::new(5.0, 5.0, 0.0),
            Point3D::new(5.0, 5.0, 5.0),
            1.0,
            100.0,
            343.0,
            0.0,
        );
        assert!((got - expected).norm() < 1e-15, "got {got}, expected {expected}");
    }

    #[test]
    fn test_overwrite_is_reported_once() {
        let mut f = field([10, 10, 10]);
        let placement = f
            .place(&monopoles(&[((2, 3, 4), 100.0), ((2, 3, 4), 250.0)]))
            .unwrap();
        assert_eq!(f.frequency_at(GridPoint::new(2, 3, 4)), Some(250.0));
        assert_eq!(f.source_count(), 1);
        assert_eq!(placement.cells_written, 2);
        assert_eq!(
            placement.overwritten,
            vec![Overwrite {
                point: GridPoint::new(2, 3, 4),
                previous: 100.0,
                frequency: 250.0,
            }]
        );
    }

    #[test]
    fn test_zero_hz_source_is_present() {
        let mut f = field([4, 4, 4]);
        f.place(&monopoles(&[((1, 1, 1), 0.0)])).unwrap();
        assert_eq!(f.frequency_at(GridPoint::new(1, 1, 1)), Some(0.0));
        assert_eq!(f.frequency_at(GridPoint::new(1, 1, 2)), None);
        assert!(f.total_pressure(GridPoint::new(1, 1, 3), 0.0).norm() > 0.0);
    }

    #[test]
    fn test_rectangular_piston_is_half_open_and_silent() {
        let mut f = field([10, 10, 10]);
        f.place(&monopoles(&[((3, 3, 1), 50.0)])).unwrap();
        let placement = f
            .place(&SourceDescriptor::RectangularPiston {
                start: [2, 3],
                end: [5, 5],
                z: 1,
                frequency: 300.0,
            })
            .unwrap();

        assert_eq!(placement.cells_written, 6);
        assert!(placement.overwritten.is_empty(), "piston overwrites are silent");
        assert_eq!(f.source_count(), 6);
        for x in 2..5 {
            for y in 3..5 {
                assert_eq!(f.frequency_at(GridPoint::new(x, y, 1)), Some(300.0));
            }
        }
        assert_eq!(f.frequency_at(GridPoint::new(5, 3, 1)), None);
        assert_eq!(f.frequency_at(GridPoint::new(2, 5, 1)), None);
    }

    #[test]
    fn test_empty_rectangle_writes_nothing() {
        let mut f = field([10, 10, 10]);
        let placement = f
            .place(&SourceDescriptor::RectangularPiston {
                start: [4, 4],
                end: [4, 8],
                z: 0,
                frequency: 300.0,
            })
            .unwrap();
        assert_eq!(placement, Placement::default());
        assert!(f.is_empty());
    }

    #[test]
    fn test_circular_piston_includes_boundary() {
        let mut f = field([10, 10, 10]);
        let placement = f
            .place(&SourceDescriptor::CircularPiston {
                center: [5, 5],
                z: 0,
                radius: 2,
                frequency: 200.0,
            })
            .unwrap();

        assert_eq!(placement.cells_written, 13);
        assert_eq!(f.frequency_at(GridPoint::new(5, 5, 0)), Some(200.0));
        assert_eq!(f.frequency_at(GridPoint::new(4, 6, 0)), Some(200.0));
        for p in [(3, 5), (7, 5), (5, 3), (5, 7)] {
            let point = GridPoint::new(p.0, p.1, 0);
            assert_eq!(f.frequency_at(point), Some(200.0), "{point:?} at d² = r²");
        }
        assert_eq!(f.frequency_at(GridPoint::new(3, 4, 0)), None);
        assert_eq!(f.frequency_at(GridPoint::new(5, 5, 1)), None);
    }

    #[test]
    fn test_circular_piston_reports_overwrites() {
        let mut f = field([10, 10, 10]);
        f.place(&monopoles(&[((5, 5, 0), 100.0), ((0, 0, 0), 100.0)])).unwrap();
        let placement = f
            .place(&SourceDescriptor::CircularPiston {
                center: [5, 5],
                z: 0,
                radius: 1,
                frequency: 200.0,
            })
            .unwrap();
        assert_eq!(placement.overwritten.len(), 1);
        assert_eq!(placement.overwritten[0].point, GridPoint::new(5, 5, 0));
        assert_eq!(placement.overwritten[0].previous, 100.0);
    }

    #[test]
    fn test_out_of_bounds_leaves_field_unchanged() {
        let mut f = field([10, 10, 10]);
        let err = f
            .place(&monopoles(&[((1, 1, 1), 100.0), ((1, 10, 1), 100.0)]))
            .unwrap_err();
        assert_eq!(
            err,
            FieldError::OutOfBounds {
                point: [1, 10, 1],
                size: [10, 10, 10],
            }
        );
        assert!(f.is_empty());

        let err = f
            .place(&SourceDescriptor::CircularPiston {
                center: [1, 5],
                z: 0,
                radius: 2,
                frequency: 200.0,
            })
            .unwrap_err();
        assert!(matches!(err, FieldError::OutOfBounds { point: [-1, 5, 0], .. }));

        let err = f
            .place(&SourceDescriptor::RectangularPiston {
                start: [0, 0],
                end: [11, 2],
                z: 0,
                frequency: 200.0,
            })
            .unwrap_err();
        assert!(matches!(err, FieldError::OutOfBounds { .. }));
        assert!(f.is_empty());
    }

    #[test]
    fn test_huge_piston_radius_is_out_of_bounds() {
        let mut f = field([10, 10, 10]);
        for radius in [usize::MAX, 1 << 63, (1 << 63) - 1, 10] {
            let err = f
                .place(&SourceDescriptor::CircularPiston {
                    center: [5, 5],
                    z: 0,
                    radius,
                    frequency: 200.0,
                })
                .unwrap_err();
            assert!(
                matches!(err, FieldError::OutOfBounds { .. }),
                "radius {radius} gave {err:?}"
            );
        }
        assert!(f.is_empty());
    }

    #[test]
    fn test_non_finite_frequency_rejected() {
        let mut f = field([4, 4, 4]);
        let err = f.place(&monopoles(&[((0, 0, 0), f64::NAN)])).unwrap_err();
        assert!(matches!(err, FieldError::InvalidFrequency(_)));
        assert!(f.is_empty());
    }

    #[test]
    fn test_superposition_is_additive() {
        let a = monopoles(&[((1, 2, 0), 120.0), ((6, 6, 3), 440.0)]);
        let b = monopoles(&[((8, 1, 7), 200.0)]);
        let both = monopoles(&[((1, 2, 0), 120.0), ((6, 6, 3), 440.0), ((8, 1, 7), 200.0)]);

        let fa = Field::with_sources(FieldConfig::new([10, 10, 10]), &a).unwrap();
        let fb = Field::with_sources(FieldConfig::new([10, 10, 10]), &b).unwrap();
        let fab = Field::with_sources(FieldConfig::new([10, 10, 10]), &both).unwrap();

        let receivers: [(usize, usize, usize); 4] = [(0, 0, 0), (5, 5, 5), (9, 2, 4), (1, 2, 0)];
        for receiver in receivers {
            let r = GridPoint::from(receiver);
            let sum = fa.total_pressure(r, 0.4) + fb.total_pressure(r, 0.4);
            let joint = fab.total_pressure(r, 0.4);
            assert!(
                (sum - joint).norm() <= 1e-12 * joint.norm().max(1.0),
                "superposition failed at {receiver:?}: {sum} vs {joint}"
            );
        }
    }

    #[test]
    fn test_inverted_phase_negates_total() {
        let f = Field::with_sources(
            FieldConfig::new([8, 8, 8]),
            &monopoles(&[((1, 1, 0), 100.0), ((6, 2, 0), 150.0)]),
        )
        .unwrap();
        let r = GridPoint::new(4, 4, 4);
        let sum = f.total_pressure(r, 0.0) + f.total_pressure(r, PI);
        assert!(sum.norm() < 1e-15, "sum = {sum}");
    }

    #[test]
    fn test_pressure_at_agrees_on_cells() {
        let f = Field::with_sources(
            FieldConfig::new([8, 8, 8]),
            &monopoles(&[((1, 1, 0), 100.0), ((6, 2, 5), 150.0)]),
        )
        .unwrap();
        let r = GridPoint::new(3, 7, 2);
        assert_eq!(f.total_pressure(r, 0.0), f.pressure_at(r.to_point(), 0.0));
        assert_eq!(f.pressures(&[r, r], 0.0).len(), 2);
    }

    #[test]
    fn test_cached_total_matches_direct() {
        let sources = monopoles(&[((1, 2, 0), 120.0), ((6, 6, 3), 440.0), ((3, 8, 3), 120.0)]);
        let direct = Field::with_sources(FieldConfig::new([10, 10, 10]), &sources).unwrap();
        let mut cached = direct.clone();

        let receivers: [(usize, usize, usize); 4] = [(0, 0, 0), (5, 5, 5), (9, 9, 9), (1, 2, 0)];
        for receiver in receivers {
            let r = GridPoint::from(receiver);
            let expected = direct.total_pressure(r, PI);
            let got = cached.total_pressure_building_cache(r, PI);
            assert!(
                (got - expected).norm() <= 1e-12 * expected.norm().max(1.0),
                "cached total differs at {receiver:?}: {got} vs {expected}"
            );
        }
        assert!(!cached.cache().is_empty());
        assert!(direct.cache().is_empty());

        cached.clear_cache();
        assert!(cached.cache().is_empty());
    }

    #[test]
    fn test_build_cache_uses_field_amplitude() {
        let config = FieldConfig {
            amplitude: 2.5,
            ..FieldConfig::new([6, 6, 6])
        };
        let mut f = Field::new(config).unwrap();
        assert!(f.build_cache(300.0, 2, 0.0));
        assert!(!f.build_cache(300.0, 2, 0.0));

        let key = CacheKey::new(300.0, 2, 0.0);
        let cached = f.cache().lookup(&key, 3, -4).unwrap();
        let direct = monopole::pressure_at_distance((9.0f64 + 16.0 + 4.0).sqrt(), 2.5, 300.0, 343.0, 0.0);
        assert!((cached - direct).norm() < 1e-15);
    }

    #[test]
    fn test_far_field_scales_by_source_count() {
        let f = Field::with_sources(
            FieldConfig::new([10, 10, 10]),
            &SourceDescriptor::RectangularPiston {
                start: [4, 4],
                end: [6, 6],
                z: 5,
                frequency: 100.0,
            },
        )
        .unwrap();
        let receiver = Point3D::new(5.0, 5.0, 200.0);
        let p = f.far_field_pressure(receiver, &FarField::default()).unwrap();
        let single = monopole::pressure(f.center(), receiver, 1.0, 100.0, 343.0, 0.0);
        assert!((p - single * 4.0).norm() < 1e-15, "p = {p}");

        // Far away the approximation is close to the exact sum.
        let exact = f.pressure_at(receiver, 0.0);
        assert!((p.norm() - exact.norm()).abs() / exact.norm() < 0.01);
    }

    #[test]
    fn test_far_field_explicit_center() {
        let f = Field::with_sources(FieldConfig::new([10, 10, 10]), &monopoles(&[((0, 0, 0), 100.0)])).unwrap();
        let options = FarField {
            center: Some(Point3D::new(0.0, 0.0, 0.0)),
            ..FarField::default()
        };
        let receiver = Point3D::new(0.0, 0.0, 50.0);
        let p = f.far_field_pressure(receiver, &options).unwrap();
        assert_eq!(p, f.pressure_at(receiver, 0.0));
    }

    #[test]
    fn test_far_field_preconditions() {
        let empty = field([10, 10, 10]);
        assert_eq!(
            empty.far_field_pressure(Point3D::new(0.0, 0.0, 0.0), &FarField::default()),
            Err(FieldError::EmptyField)
        );

        let mixed = Field::with_sources(
            FieldConfig::new([10, 10, 10]),
            &monopoles(&[((0, 0, 0), 200.0), ((1, 0, 0), 100.0)]),
        )
        .unwrap();
        assert_eq!(
            mixed.far_field_pressure(Point3D::new(0.0, 0.0, 0.0), &FarField::default()),
            Err(FieldError::MixedFrequencies {
                frequencies: vec![100.0, 200.0]
            })
        );

        let explicit = FarField {
            frequency: Some(150.0),
            ..FarField::default()
        };
        assert!(mixed
            .far_field_pressure(Point3D::new(0.0, 0.0, 0.0), &explicit)
            .is_ok());
    }

    #[test]
    fn test_arc_profile_modes() {
        let f = Field::with_sources(
            FieldConfig::new([40, 3, 40]),
            &monopoles(&[((20, 1, 0), 343.0)]),
        )
        .unwrap();
        let exact = f
            .arc_pressure_profile(GridPoint::new(20, 1, 0), 15.0, ArcMode::Exact)
            .unwrap();
        let far = f
            .arc_pressure_profile(GridPoint::new(20, 1, 0), 15.0, ArcMode::FarField)
            .unwrap();
        assert_eq!(exact.len(), sampling::ARC_STEPS);
        assert_eq!(far.len(), exact.len());
        for &(angle, magnitude) in &exact {
            assert!((0.0..=PI).contains(&angle));
            assert!(magnitude.is_finite() && magnitude > 0.0);
        }

        let mixed = Field::with_sources(
            FieldConfig::new([40, 3, 40]),
            &monopoles(&[((20, 1, 0), 343.0), ((21, 1, 0), 686.0)]),
        )
        .unwrap();
        assert!(mixed
            .arc_pressure_profile(GridPoint::new(20, 1, 0), 15.0, ArcMode::FarField)
            .is_err());
    }

    #[test]
    fn test_source_cloud_lists_every_source() {
        let f = Field::with_sources(
            FieldConfig::new([10, 10, 10]),
            &monopoles(&[((5, 5, 0), 100.0), ((1, 1, 1), 0.0)]),
        )
        .unwrap();
        let cloud = f.source_cloud();
        assert_eq!(cloud.points, vec![GridPoint::new(1, 1, 1), GridPoint::new(5, 5, 0)]);
        assert_eq!(cloud.frequencies, vec![0.0, 100.0]);
        assert_eq!(f.frequencies(), vec![0.0, 100.0]);
    }
}
