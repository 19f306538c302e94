//! Physical site properties.

use serde::{Deserialize, Serialize};

/// A physical site hosting zero or more nodes.
///
/// Sites are immutable during a simulation run and shared between nodes via
/// `Rc` handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Site identifier.
    pub id: String,
    /// Power-usage-effectiveness of the facility, at least 1.0.
    pub pue: f64,
    /// Metering calibration factor applied to computed emissions.
    pub k: f64,
    /// Region or grid identifier, used by carbon-intensity data sources.
    #[serde(default)]
    pub region: String,
}

impl Site {
    pub fn new(id: &str, pue: f64, k: f64, region: &str) -> Self {
        Self {
            id: id.to_string(),
            pue,
            k,
            region: region.to_string(),
        }
    }

    /// PUE guarded against unset or nonsensical values.
    pub fn effective_pue(&self) -> f64 {
        if self.pue > 0. {
            self.pue
        } else {
            1.0
        }
    }

    /// Calibration factor guarded against unset or nonsensical values.
    pub fn effective_k(&self) -> f64 {
        if self.k > 0. {
            self.k
        } else {
            1.0
        }
    }
}
