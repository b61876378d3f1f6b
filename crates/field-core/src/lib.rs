pub mod cache;
pub mod constants;
pub mod error;
pub mod field;
pub mod interference;
pub mod monopole;
pub mod sampling;

use serde::{Deserialize, Serialize};

pub use error::{FieldError, Result};
pub use field::{ArcMode, FarField, Field, Monopole, Overwrite, Placement, SourceCloud, SourceDescriptor};
pub use interference::{Cancellation, SelfInterference};

// ---------------------------------------------------------------------------
// Shared interface types
// ---------------------------------------------------------------------------

/// Integer cell index into a field, `(x, y, z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl GridPoint {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Real-valued position of the cell, one grid unit per cell.
    pub fn to_point(self) -> Point3D {
        Point3D::new(self.x as f64, self.y as f64, self.z as f64)
    }
}

impl From<(usize, usize, usize)> for GridPoint {
    fn from((x, y, z): (usize, usize, usize)) -> Self {
        Self::new(x, y, z)
    }
}

/// A position in grid units that need not sit on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Point3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl From<GridPoint> for Point3D {
    fn from(p: GridPoint) -> Self {
        p.to_point()
    }
}

/// Construction parameters for a [`Field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Grid dimensions `(x, y, z)` in cells.
    pub size: [usize; 3],
    /// Propagation speed in grid units per second (m/s at one metre per cell).
    pub speed_of_sound: f64,
    /// Source strength `Q`, shared by every source in the field.
    pub amplitude: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            size: constants::DEFAULT_FIELD_SIZE,
            speed_of_sound: constants::DEFAULT_SPEED_OF_SOUND,
            amplitude: constants::DEFAULT_AMPLITUDE,
        }
    }
}

impl FieldConfig {
    pub fn new(size: [usize; 3]) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Check the dimensions and propagation speed.
    pub fn validate(&self) -> Result<()> {
        if self.size.iter().any(|&n| n == 0) {
            return Err(FieldError::InvalidConfig {
                message: format!("field dimensions must be positive, got {:?}", self.size),
            });
        }
        if !(self.speed_of_sound.is_finite() && self.speed_of_sound > 0.0) {
            return Err(FieldError::InvalidConfig {
                message: format!(
                    "speed of sound must be positive and finite, got {}",
                    self.speed_of_sound
                ),
            });
        }
        if !self.amplitude.is_finite() {
            return Err(FieldError::InvalidConfig {
                message: format!("source amplitude must be finite, got {}", self.amplitude),
            });
        }
        Ok(())
    }
}
