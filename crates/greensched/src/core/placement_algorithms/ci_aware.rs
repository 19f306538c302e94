//! CI-Aware weighted scoring algorithm.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::carbon::carbon_cost;
use crate::core::common::Scores;
use crate::core::config::{parse_options, RobustScalingConfig, SimulationConfig};
use crate::core::node::Node;
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::workload::Workload;

/// Weights for the score terms; all features are scaled to `[0, 1]` before
/// weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    /// carbon-impact term
    pub carbon: f64,
    /// wait proxy term
    pub wait: f64,
    /// utilisation guard term
    pub util: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            carbon: 0.8,
            wait: 0.2,
            util: 0.05,
        }
    }
}

/// Weight combinations worth sweeping when tuning the policy.
pub fn recommended_weight_grid() -> Vec<Weights> {
    vec![
        Weights { carbon: 0.5, wait: 0.0, util: 0.0 },
        Weights { carbon: 0.8, wait: 0.2, util: 0.05 },
        Weights { carbon: 1.1, wait: 0.2, util: 0.05 },
        Weights { carbon: 1.4, wait: 0.2, util: 0.05 },
        Weights { carbon: 1.4, wait: 0.4, util: 0.1 },
    ]
}

/// Scores each feasible node by a weighted sum of three features, each
/// robust-scaled onto `[0, 1]` across the candidate set:
///
/// 1. estimated carbon cost of running the job on the node now;
/// 2. seconds until the node could fit the job (zero when it already can);
/// 3. current combined utilisation, clamped to `[0, 1]`.
pub struct CiAware {
    weights: Weights,
    scaling: RobustScalingConfig,
}

impl CiAware {
    pub fn new(weights: Weights, scaling: RobustScalingConfig) -> Self {
        Self { weights, scaling }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            Weights {
                carbon: config.carbon_weight,
                wait: config.wait_weight,
                util: config.util_weight,
            },
            config.robust_scaling,
        )
    }

    /// Builds the policy from an options string such as
    /// `carbon=0.8,wait=0.2,util=0.05`.
    pub fn from_options(options_str: &str, scaling: RobustScalingConfig) -> Self {
        let options = parse_options(options_str);
        let defaults = Weights::default();
        let parse = |key: &str, default: f64| {
            options
                .get(key)
                .and_then(|raw| raw.parse::<f64>().ok())
                .unwrap_or(default)
        };
        Self::new(
            Weights {
                carbon: parse("carbon", defaults.carbon),
                wait: parse("wait", defaults.wait),
                util: parse("util", defaults.util),
            },
            scaling,
        )
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }
}

impl PlacementAlgorithm for CiAware {
    fn name(&self) -> &str {
        "ci_aware"
    }

    fn score(&self, workload: &Workload, nodes: &[Rc<RefCell<Node>>], time: f64) -> Scores {
        struct Features {
            key: String,
            ci_cost: f64,
            wait_secs: f64,
            util: f64,
        }

        let mut features = Vec::with_capacity(nodes.len());
        for node in nodes {
            let node = node.borrow();
            if !node.can_accept(workload) {
                continue;
            }
            features.push(Features {
                key: node.name().to_string(),
                ci_cost: carbon_cost(&node, workload, time),
                wait_secs: node.time_to_fit(workload, time).unwrap_or(0.),
                util: node.utilization().clamp(0., 1.),
            });
        }

        let ci_scale = ScaleBounds::over(features.iter().map(|f| f.ci_cost), &self.scaling);
        let wait_scale = ScaleBounds::over(features.iter().map(|f| f.wait_secs), &self.scaling);
        let util_scale = ScaleBounds::over(features.iter().map(|f| f.util), &self.scaling);

        let mut scores = Scores::new();
        for f in features {
            let score = self.weights.carbon * ci_scale.apply(f.ci_cost)
                + self.weights.wait * wait_scale.apply(f.wait_secs)
                + self.weights.util * util_scale.apply(f.util);
            scores.insert(f.key, score);
        }
        scores
    }
}

/// Linear map of a feature onto `[0, 1]`, with a degenerate-range collapse
/// to zero.
struct ScaleBounds {
    low: f64,
    width: f64,
}

impl ScaleBounds {
    /// Derives bounds over the candidate values: the 5th-95th percentile span
    /// when robust scaling is enabled, min-max otherwise. A width below the
    /// configured epsilon collapses the feature to zero, which also covers
    /// the single-candidate case.
    fn over(values: impl Iterator<Item = f64>, config: &RobustScalingConfig) -> Self {
        let mut clean: Vec<f64> = values.filter(|v| v.is_finite()).collect();
        if clean.is_empty() {
            return Self { low: 0., width: 0. };
        }
        clean.sort_by(|a, b| a.total_cmp(b));
        let (low, high) = if config.enable {
            (
                percentile(&clean, config.q_low),
                percentile(&clean, config.q_high),
            )
        } else {
            (clean[0], clean[clean.len() - 1])
        };
        let width = high - low;
        if width < config.eps {
            Self { low: 0., width: 0. }
        } else {
            Self { low, width }
        }
    }

    fn apply(&self, value: f64) -> f64 {
        if self.width == 0. {
            return 0.;
        }
        ((value - self.low) / self.width).clamp(0., 1.)
    }
}

/// Linear-interpolated percentile over a sorted slice, `q` in `[0, 1]`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if q <= 0. {
        return sorted[0];
    }
    if q >= 1. {
        return sorted[sorted.len() - 1];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let values = [1., 2., 3., 4., 5.];
        assert_eq!(percentile(&values, 0.), 1.);
        assert_eq!(percentile(&values, 1.), 5.);
        assert_eq!(percentile(&values, 0.5), 3.);
        assert_eq!(percentile(&values, 0.625), 3.5);
    }

    #[test]
    fn degenerate_range_collapses_to_zero() {
        let config = RobustScalingConfig::default();
        let bounds = ScaleBounds::over([2.0, 2.0, 2.0].into_iter(), &config);
        assert_eq!(bounds.apply(2.0), 0.);
        let single = ScaleBounds::over([7.0].into_iter(), &config);
        assert_eq!(single.apply(7.0), 0.);
    }

    #[test]
    fn min_max_fallback_when_disabled() {
        let config = RobustScalingConfig {
            enable: false,
            ..Default::default()
        };
        let bounds = ScaleBounds::over([0.0, 10.0].into_iter(), &config);
        assert_eq!(bounds.apply(0.), 0.);
        assert_eq!(bounds.apply(5.), 0.5);
        assert_eq!(bounds.apply(10.), 1.);
        assert_eq!(bounds.apply(15.), 1.);
    }

    #[test]
    fn options_override_defaults() {
        let policy = CiAware::from_options("carbon=1.4,wait=0.4", RobustScalingConfig::default());
        assert_eq!(policy.weights().carbon, 1.4);
        assert_eq!(policy.weights().wait, 0.4);
        assert_eq!(policy.weights().util, 0.05);
    }
}
