use crate::constants::DISTANCE_EPSILON;
use crate::Point3D;
use num_complex::Complex64;
use std::f64::consts::PI;

/// Wave number k = 2π·f / c.
pub fn wave_number(frequency: f64, c: f64) -> f64 {
    2.0 * PI * frequency / c
}

/// Complex pressure of a monopole of strength `amplitude` at distance `r`.
///
/// p = Q · exp(−i·(k·R + φ)) / (4π·R)
///
/// A zero distance is replaced by [`DISTANCE_EPSILON`] so coincident
/// source and receiver stay finite.
pub fn pressure_at_distance(r: f64, amplitude: f64, frequency: f64, c: f64, phase: f64) -> Complex64 {
    let r = if r == 0.0 { DISTANCE_EPSILON } else { r };
    let k = wave_number(frequency, c);
    Complex64::from_polar(amplitude / (4.0 * PI * r), -(k * r + phase))
}

/// Complex pressure at `receiver` from a monopole at `source`.
pub fn pressure(
    source: Point3D,
    receiver: Point3D,
    amplitude: f64,
    frequency: f64,
    c: f64,
    phase: f64,
) -> Complex64 {
    pressure_at_distance(source.distance_to(&receiver), amplitude, frequency, c, phase)
}
