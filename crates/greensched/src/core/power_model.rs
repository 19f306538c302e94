//! Host power consumption models.

use dyn_clone::{clone_trait_object, DynClone};

/// Fraction of peak power a host draws while idle.
pub const IDLE_POWER_FRACTION: f64 = 0.15;

/// Power model of a physical node.
pub trait HostPowerModel: DynClone {
    /// Returns the power draw in watts for the given CPU share in `[0, 1]`.
    fn power(&self, cpu_share: f64) -> f64;
}

clone_trait_object!(HostPowerModel);

/// Linear interpolation between idle and peak power consumption.
#[derive(Clone)]
pub struct LinearPowerModel {
    idle_power: f64,
    dynamic_span: f64,
}

impl LinearPowerModel {
    /// Creates a linear power model with explicit peak and idle draw.
    pub fn new(peak_power: f64, idle_power: f64) -> Self {
        Self {
            idle_power,
            dynamic_span: (peak_power - idle_power).max(0.),
        }
    }

    /// Creates the model from a peak draw alone, assuming the standard idle
    /// fraction.
    pub fn from_peak(peak_power: f64) -> Self {
        Self::new(peak_power, peak_power * IDLE_POWER_FRACTION)
    }
}

impl HostPowerModel for LinearPowerModel {
    fn power(&self, cpu_share: f64) -> f64 {
        self.idle_power + self.dynamic_span * cpu_share
    }
}

/// Constant power consumption regardless of load.
#[derive(Clone)]
pub struct ConstantPowerModel {
    power: f64,
}

impl ConstantPowerModel {
    pub fn new(power: f64) -> Self {
        Self { power }
    }
}

impl HostPowerModel for ConstantPowerModel {
    fn power(&self, _cpu_share: f64) -> f64 {
        self.power
    }
}
