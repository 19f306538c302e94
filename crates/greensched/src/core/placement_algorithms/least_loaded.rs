//! Least Loaded algorithm.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::common::Scores;
use crate::core::node::Node;
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::workload::Workload;

/// Spreads load: prefers the feasible node with the lowest combined CPU and
/// memory utilisation, the way the Kubernetes default scorer does.
#[derive(Default)]
pub struct LeastLoaded;

impl LeastLoaded {
    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementAlgorithm for LeastLoaded {
    fn name(&self) -> &str {
        "least_loaded"
    }

    fn score(&self, workload: &Workload, nodes: &[Rc<RefCell<Node>>], _time: f64) -> Scores {
        let mut scores = Scores::new();
        for node in nodes {
            let node = node.borrow();
            if node.can_accept(workload) {
                scores.insert(node.name().to_string(), node.utilization());
            }
        }
        scores
    }
}
