//! Simulation configuration.

use serde::{Deserialize, Serialize};

/// Auxiliary structure to parse [`SimulationConfig`] from a YAML file, with
/// every knob optional.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfigRaw {
    /// placement policy, e.g. "LeastLoaded" or "CiAware[carbon=0.8,wait=0.2,util=0.05]"
    pub policy: Option<String>,
    /// number of pending jobs required to flush a batch
    pub batch_size: Option<usize>,
    /// base carbon weight of the min-cost-flow policy
    pub ci_base_weight: Option<f64>,
    /// volatility inflation coefficient of the min-cost-flow carbon weight
    pub ci_dyn_alpha: Option<f64>,
    /// carbon term weight of the CI-aware policy
    pub carbon_weight: Option<f64>,
    /// wait term weight of the CI-aware policy
    pub wait_weight: Option<f64>,
    /// utilisation term weight of the CI-aware policy
    pub util_weight: Option<f64>,
    /// carbon term weight of the CarbonScaler policy
    pub lambda: Option<f64>,
    /// robust feature scaling used by the CI-aware policy
    pub robust_scaling: Option<RobustScalingConfigRaw>,
    /// physical sites referenced by nodes
    pub sites: Option<Vec<SiteConfig>>,
    /// cluster nodes
    pub nodes: Option<Vec<NodeConfig>>,
}

/// Percentile-based feature scaling settings.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct RobustScalingConfigRaw {
    pub enable: Option<bool>,
    pub q_low: Option<f64>,
    pub q_high: Option<f64>,
    pub eps: Option<f64>,
}

/// Resolved percentile-based feature scaling settings.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Copy)]
pub struct RobustScalingConfig {
    /// fall back to min-max scaling when disabled
    pub enable: bool,
    /// lower percentile, in (0, 0.5)
    pub q_low: f64,
    /// upper percentile, in (0.5, 1)
    pub q_high: f64,
    /// degenerate-range guard
    pub eps: f64,
}

impl Default for RobustScalingConfig {
    fn default() -> Self {
        Self {
            enable: true,
            q_low: 0.05,
            q_high: 0.95,
            eps: 1e-9,
        }
    }
}

impl RobustScalingConfig {
    fn from_raw(raw: RobustScalingConfigRaw) -> Self {
        let defaults = Self::default();
        let mut config = Self {
            enable: raw.enable.unwrap_or(defaults.enable),
            q_low: raw.q_low.unwrap_or(defaults.q_low),
            q_high: raw.q_high.unwrap_or(defaults.q_high),
            eps: raw.eps.unwrap_or(defaults.eps),
        };
        if config.q_low <= 0. || config.q_low >= 0.5 {
            config.q_low = defaults.q_low;
        }
        if config.q_high <= 0.5 || config.q_high >= 1. {
            config.q_high = defaults.q_high;
        }
        if config.eps <= 0. {
            config.eps = defaults.eps;
        }
        config
    }
}

/// Represents a physical site in the config.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SiteConfig {
    pub id: String,
    /// power-usage-effectiveness, at least 1.0
    pub pue: f64,
    /// metering calibration factor
    pub k: f64,
    /// region or grid identifier
    #[serde(default)]
    pub region: String,
}

/// Represents node(s) configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct NodeConfig {
    /// Node name. Should be set if count = 1
    pub name: Option<String>,
    /// Node name prefix. Full name is produced by appending the instance
    /// number to the prefix. Should be set if count > 1
    pub name_prefix: Option<String>,
    /// node CPU capacity
    pub cpus: f64,
    /// node memory capacity
    pub memory: f64,
    /// carbon-intensity profile descriptor
    #[serde(default = "default_ci_profile")]
    pub ci_profile: String,
    /// id of the site hosting this node
    pub site: Option<String>,
    /// peak power draw in watts
    pub peak_power_w: Option<f64>,
    /// number of such nodes
    pub count: Option<u32>,
}

fn default_ci_profile() -> String {
    "static:0".to_string()
}

/// Resolved simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// placement policy descriptor
    pub policy: String,
    /// number of pending jobs required to flush a batch
    pub batch_size: usize,
    /// base carbon weight of the min-cost-flow policy
    pub ci_base_weight: f64,
    /// volatility inflation coefficient of the min-cost-flow carbon weight
    pub ci_dyn_alpha: f64,
    /// carbon term weight of the CI-aware policy
    pub carbon_weight: f64,
    /// wait term weight of the CI-aware policy
    pub wait_weight: f64,
    /// utilisation term weight of the CI-aware policy
    pub util_weight: f64,
    /// carbon term weight of the CarbonScaler policy
    pub lambda: f64,
    /// robust feature scaling used by the CI-aware policy
    pub robust_scaling: RobustScalingConfig,
    /// physical sites referenced by nodes
    pub sites: Vec<SiteConfig>,
    /// cluster nodes
    pub nodes: Vec<NodeConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            policy: "LeastLoaded".to_string(),
            batch_size: 1,
            ci_base_weight: 0.1,
            ci_dyn_alpha: 1.0,
            carbon_weight: 0.8,
            wait_weight: 0.2,
            util_weight: 0.05,
            lambda: 1.0,
            robust_scaling: RobustScalingConfig::default(),
            sites: Vec::new(),
            nodes: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Creates the config from a YAML file, applying defaults for omitted
    /// fields.
    pub fn from_file(file_name: &str) -> Self {
        let raw: SimulationConfigRaw = serde_yaml::from_str(
            &std::fs::read_to_string(file_name)
                .unwrap_or_else(|_| panic!("can't read config file {}", file_name)),
        )
        .unwrap_or_else(|err| panic!("can't parse config file {}: {}", file_name, err));
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: SimulationConfigRaw) -> Self {
        let defaults = Self::default();
        Self {
            policy: raw.policy.unwrap_or(defaults.policy),
            batch_size: raw.batch_size.unwrap_or(defaults.batch_size).max(1),
            ci_base_weight: raw.ci_base_weight.unwrap_or(defaults.ci_base_weight),
            ci_dyn_alpha: raw.ci_dyn_alpha.unwrap_or(defaults.ci_dyn_alpha),
            carbon_weight: raw.carbon_weight.unwrap_or(defaults.carbon_weight),
            wait_weight: raw.wait_weight.unwrap_or(defaults.wait_weight),
            util_weight: raw.util_weight.unwrap_or(defaults.util_weight),
            lambda: raw.lambda.unwrap_or(defaults.lambda),
            robust_scaling: raw
                .robust_scaling
                .map(RobustScalingConfig::from_raw)
                .unwrap_or_default(),
            sites: raw.sites.unwrap_or_default(),
            nodes: raw.nodes.unwrap_or_default(),
        }
    }

    /// Returns the total node count across all node blocks.
    pub fn number_of_nodes(&self) -> u32 {
        self.nodes.iter().map(|n| n.count.unwrap_or(1)).sum()
    }
}

/// Parses a config value string, which consists of two parts - name and
/// options. Example: `CiAware[carbon=0.8,wait=0.2]` parts are name `CiAware`
/// and options string `carbon=0.8,wait=0.2`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.to_string(), Some(r.to_string().replace(']', ""))),
        None => (config_str.to_string(), None),
    }
}

/// Parses an options string from a config value, returns a map with option
/// names and values.
pub fn parse_options(options_str: &str) -> std::collections::HashMap<String, String> {
    let mut options = std::collections::HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.to_string(), value.to_string());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_value_splits_name_and_options() {
        assert_eq!(parse_config_value("LeastLoaded"), ("LeastLoaded".to_string(), None));
        assert_eq!(
            parse_config_value("CarbonScaler[lambda=0.5]"),
            ("CarbonScaler".to_string(), Some("lambda=0.5".to_string()))
        );
    }

    #[test]
    fn parse_options_builds_a_map() {
        let options = parse_options("carbon=0.8,wait=0.2,util=0.05");
        assert_eq!(options.get("carbon").unwrap(), "0.8");
        assert_eq!(options.get("wait").unwrap(), "0.2");
        assert_eq!(options.get("util").unwrap(), "0.05");
        assert_eq!(options.get("missing"), None);
    }

    #[test]
    fn raw_config_defaults() {
        let config = SimulationConfig::from_raw(SimulationConfigRaw {
            policy: None,
            batch_size: Some(0),
            ci_base_weight: None,
            ci_dyn_alpha: None,
            carbon_weight: None,
            wait_weight: None,
            util_weight: None,
            lambda: None,
            robust_scaling: None,
            sites: None,
            nodes: None,
        });
        assert_eq!(config.policy, "LeastLoaded");
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.robust_scaling.q_low, 0.05);
        assert_eq!(config.robust_scaling.q_high, 0.95);
    }

    #[test]
    fn out_of_range_percentiles_are_reset() {
        let scaling = RobustScalingConfig::from_raw(RobustScalingConfigRaw {
            enable: Some(true),
            q_low: Some(0.7),
            q_high: Some(0.3),
            eps: Some(-1.),
        });
        assert_eq!(scaling.q_low, 0.05);
        assert_eq!(scaling.q_high, 0.95);
        assert_eq!(scaling.eps, 1e-9);
    }
}
