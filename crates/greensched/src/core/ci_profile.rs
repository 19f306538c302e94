//! Carbon-intensity profiles.
//!
//! A profile is described by a colon-separated string and evaluated as a pure
//! function of time, so that carbon costs stay deterministic and testable in
//! isolation. Supported descriptors:
//!
//! - `static:<value>`: constant gCO₂/kWh;
//! - `sine:<mean>:<amp>:<periodSec>`: diurnal-style oscillation;
//! - `randwalk:<min>:<max>:<stepSec>`: reads the node's live intensity
//!   field, which an external driver is expected to update (see
//!   [`RandomWalkDriver`](crate::extensions::ci_driver::RandomWalkDriver));
//!   without a driver it behaves as static at the last-known value.
//!
//! Unknown or malformed descriptors fall back to the last-known value.

use std::f64::consts::PI;

/// Parsed carbon-intensity profile of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum CiProfile {
    /// Constant intensity.
    Static(f64),
    /// `mean + amplitude * sin(2π * (t mod period) / period)`.
    Sine {
        mean: f64,
        amplitude: f64,
        period_secs: f64,
    },
    /// Bounded random walk driven externally through the node's live field.
    RandomWalk {
        min: f64,
        max: f64,
        step_secs: f64,
    },
    /// Fallback: report the node's last-known intensity.
    LastKnown,
}

impl CiProfile {
    /// Parses a profile descriptor, falling back to [`CiProfile::LastKnown`]
    /// on anything malformed.
    pub fn parse(descriptor: &str) -> Self {
        let parts: Vec<&str> = descriptor.split(':').collect();
        match parts[0] {
            "static" if parts.len() == 2 => match parts[1].parse::<f64>() {
                Ok(value) => CiProfile::Static(value),
                Err(_) => CiProfile::LastKnown,
            },
            "sine" if parts.len() == 4 => {
                match (
                    parts[1].parse::<f64>(),
                    parts[2].parse::<f64>(),
                    parts[3].parse::<f64>(),
                ) {
                    (Ok(mean), Ok(amplitude), Ok(period_secs)) => CiProfile::Sine {
                        mean,
                        amplitude,
                        period_secs,
                    },
                    _ => CiProfile::LastKnown,
                }
            }
            "randwalk" if parts.len() == 4 => {
                match (
                    parts[1].parse::<f64>(),
                    parts[2].parse::<f64>(),
                    parts[3].parse::<f64>(),
                ) {
                    (Ok(min), Ok(max), Ok(step_secs)) => CiProfile::RandomWalk { min, max, step_secs },
                    _ => CiProfile::LastKnown,
                }
            }
            _ => CiProfile::LastKnown,
        }
    }

    /// Evaluates the profile at `time` (seconds), given the node's last-known
    /// intensity for the variants that depend on it.
    pub fn value_at(&self, time: f64, last_known: f64) -> f64 {
        match *self {
            CiProfile::Static(value) => value,
            CiProfile::Sine {
                mean,
                amplitude,
                period_secs,
            } => {
                if period_secs <= 0. {
                    return mean;
                }
                // whole seconds, as grid data sources report
                let phase = time.floor().rem_euclid(period_secs);
                mean + amplitude * (2. * PI * phase / period_secs).sin()
            }
            CiProfile::RandomWalk { .. } | CiProfile::LastKnown => last_known,
        }
    }

    /// A representative constant value used to seed the node's live intensity
    /// field when loading node records.
    pub fn baseline(&self) -> f64 {
        match *self {
            CiProfile::Static(value) => value,
            CiProfile::Sine { mean, .. } => mean,
            CiProfile::RandomWalk { min, max, .. } => (min + max) / 2.,
            CiProfile::LastKnown => 0.,
        }
    }
}
