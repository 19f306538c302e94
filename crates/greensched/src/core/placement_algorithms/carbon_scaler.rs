//! CarbonScaler-style algorithm.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::carbon::carbon_cost;
use crate::core::common::Scores;
use crate::core::config::parse_options;
use crate::core::node::Node;
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::workload::Workload;

const NORM_EPS: f64 = 1e-12;

/// Scores each feasible node as `util + lambda * ci_norm`, where `ci_norm`
/// is the min-max normalised carbon cost across the candidate set (zero when
/// all candidates cost the same).
pub struct CarbonScaler {
    lambda: f64,
}

impl CarbonScaler {
    pub fn new(lambda: f64) -> Self {
        Self { lambda }
    }

    /// Builds the policy from an options string such as `lambda=0.5`.
    pub fn from_options(options_str: &str) -> Self {
        let lambda = parse_options(options_str)
            .get("lambda")
            .and_then(|raw| raw.parse::<f64>().ok())
            .unwrap_or(1.0);
        Self::new(lambda)
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl PlacementAlgorithm for CarbonScaler {
    fn name(&self) -> &str {
        "carbonscaler"
    }

    fn score(&self, workload: &Workload, nodes: &[Rc<RefCell<Node>>], time: f64) -> Scores {
        let mut candidates = Vec::with_capacity(nodes.len());
        for node in nodes {
            let node = node.borrow();
            if !node.can_accept(workload) {
                continue;
            }
            candidates.push((
                node.name().to_string(),
                node.utilization(),
                carbon_cost(&node, workload, time),
            ));
        }

        let min_cost = candidates.iter().map(|c| c.2).fold(f64::INFINITY, f64::min);
        let max_cost = candidates.iter().map(|c| c.2).fold(f64::NEG_INFINITY, f64::max);
        let denom = max_cost - min_cost;

        let mut scores = Scores::new();
        for (name, util, cost) in candidates {
            let ci_norm = if denom > NORM_EPS {
                (cost - min_cost) / denom
            } else {
                0.
            };
            scores.insert(name, util + self.lambda * ci_norm);
        }
        scores
    }
}
