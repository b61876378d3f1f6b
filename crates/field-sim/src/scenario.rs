// Scenario file: field configuration, sources, and the queries to run.

use field_core::{ArcMode, FarField, FieldConfig, GridPoint, Point3D, SourceDescriptor};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub field: FieldConfig,
    /// Air temperature in °C. Overrides `field.speed_of_sound` when set.
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
    #[serde(default)]
    pub queries: Vec<Query>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Query {
    Pressure {
        point: GridPoint,
        #[serde(default)]
        phase: f64,
    },
    FarField {
        point: Point3D,
        #[serde(flatten)]
        options: FarField,
    },
    Cancellation {
        center: GridPoint,
        radius: usize,
    },
    ArcProfile {
        center: GridPoint,
        radius: f64,
        #[serde(default)]
        mode: ArcMode,
    },
    Hemisphere {
        center: GridPoint,
        radius: f64,
    },
}

/// Complex value as `[re, im]` plus its magnitude.
#[derive(Debug, Clone, Serialize)]
pub struct ComplexValue {
    pub re: f64,
    pub im: f64,
    pub magnitude: f64,
}

impl From<num_complex::Complex64> for ComplexValue {
    fn from(c: num_complex::Complex64) -> Self {
        Self {
            re: c.re,
            im: c.im,
            magnitude: c.norm(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryResult {
    Pressure {
        point: GridPoint,
        pressure: ComplexValue,
    },
    FarField {
        point: Point3D,
        pressure: ComplexValue,
    },
    Cancellation {
        center: GridPoint,
        radius: usize,
        residual: ComplexValue,
        ratio: f64,
    },
    ArcProfile {
        angles: Vec<f64>,
        magnitudes: Vec<f64>,
    },
    Hemisphere {
        points: Vec<GridPoint>,
        magnitudes: Vec<f64>,
    },
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Field configuration with the temperature override applied.
    pub fn field_config(&self) -> FieldConfig {
        let mut config = self.field.clone();
        if let Some(t) = self.temperature {
            config.speed_of_sound = field_core::constants::speed_of_sound(t);
        }
        config
    }
}
