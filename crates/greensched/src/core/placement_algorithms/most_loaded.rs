//! Most Loaded algorithm.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::common::Scores;
use crate::core::node::Node;
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::workload::Workload;

/// Bin-packs: prefers the feasible node with the highest combined CPU and
/// memory utilisation (Swarm-style). Scores are negated so that the shared
/// argmin selection still applies.
#[derive(Default)]
pub struct MostLoaded;

impl MostLoaded {
    pub fn new() -> Self {
        Default::default()
    }
}

impl PlacementAlgorithm for MostLoaded {
    fn name(&self) -> &str {
        "most_loaded"
    }

    fn score(&self, workload: &Workload, nodes: &[Rc<RefCell<Node>>], _time: f64) -> Scores {
        let mut scores = Scores::new();
        for node in nodes {
            let node = node.borrow();
            if node.can_accept(workload) {
                scores.insert(node.name().to_string(), -node.utilization());
            }
        }
        scores
    }
}
