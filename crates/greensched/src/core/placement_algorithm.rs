//! Placement algorithms.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::common::{arg_min, Scores};
use crate::core::config::{parse_config_value, SimulationConfig};
use crate::core::node::Node;
use crate::core::placement_algorithms::carbon_scaler::CarbonScaler;
use crate::core::placement_algorithms::ci_aware::CiAware;
use crate::core::placement_algorithms::least_loaded::LeastLoaded;
use crate::core::placement_algorithms::min_cost_flow::MinCostFlow;
use crate::core::placement_algorithms::most_loaded::MostLoaded;
use crate::core::workload::Workload;

/// Trait for implementation of placement algorithms.
///
/// An algorithm scores the feasible nodes for a workload at the current
/// simulation time (lower is better) and selects the argmin, with ties broken
/// towards the lexicographically smallest node name. Policies that compute a
/// single global assignment for a whole batch override
/// [`PlacementAlgorithm::assign_batch`].
pub trait PlacementAlgorithm {
    /// Human-readable policy name used in logs and sweep summaries.
    fn name(&self) -> &str;

    /// Scores every node that can currently accept `workload`. An empty map
    /// means no feasible node exists.
    fn score(&self, workload: &Workload, nodes: &[Rc<RefCell<Node>>], time: f64) -> Scores;

    /// Picks the winning node from the scores.
    fn select(&self, scores: &Scores) -> Option<String> {
        arg_min(scores)
    }

    /// Convenience composition of [`PlacementAlgorithm::score`] and
    /// [`PlacementAlgorithm::select`].
    fn select_node(&self, workload: &Workload, nodes: &[Rc<RefCell<Node>>], time: f64) -> Option<String> {
        let scores = self.score(workload, nodes, time);
        if scores.is_empty() {
            return None;
        }
        self.select(&scores)
    }

    /// Computes one assignment for the whole batch: for each workload the
    /// index of the selected node, or `None` to keep it pending. Returns
    /// `None` when the policy has no batch mode, in which case the engine
    /// falls back to per-job selection.
    fn assign_batch(
        &self,
        _workloads: &[Workload],
        _nodes: &[Rc<RefCell<Node>>],
        _time: f64,
    ) -> Option<Vec<Option<usize>>> {
        None
    }
}

/// Creates a placement algorithm from its config descriptor.
pub fn placement_algorithm_resolver(config: &SimulationConfig) -> Box<dyn PlacementAlgorithm> {
    let (name, options) = parse_config_value(&config.policy);
    match name.as_str() {
        "LeastLoaded" => Box::new(LeastLoaded::new()),
        "MostLoaded" => Box::new(MostLoaded::new()),
        "CiAware" => match options {
            Some(options) => Box::new(CiAware::from_options(&options, config.robust_scaling)),
            None => Box::new(CiAware::from_config(config)),
        },
        "CarbonScaler" => match options {
            Some(options) => Box::new(CarbonScaler::from_options(&options)),
            None => Box::new(CarbonScaler::new(config.lambda)),
        },
        "MinCostFlow" => match options {
            Some(options) => Box::new(MinCostFlow::from_options(&options)),
            None => Box::new(MinCostFlow::new(config.ci_base_weight, config.ci_dyn_alpha)),
        },
        _ => panic!("can't resolve placement algorithm: {}", config.policy),
    }
}
