/// Speed of sound in air at roughly 20 °C (m/s).
pub const DEFAULT_SPEED_OF_SOUND: f64 = 343.0;

/// Default monopole source strength `Q`.
pub const DEFAULT_AMPLITUDE: f64 = 1.0;

/// Default grid dimensions.
pub const DEFAULT_FIELD_SIZE: [usize; 3] = [256, 256, 256];

/// Distance substituted when a receiver coincides with a source.
pub const DISTANCE_EPSILON: f64 = 1e-10;

/// Speed of sound in air (m/s) as a function of temperature in °C.
/// Uses the ideal-gas approximation.
pub fn speed_of_sound(temperature_c: f64) -> f64 {
    let t_kelvin = temperature_c + 273.15;
    // c = 331.3 * sqrt(T/273.15)
    331.3 * (t_kelvin / 273.15).sqrt()
}
