//! Common data structures.

use std::collections::BTreeMap;

/// Tolerance used when comparing floating-point resource amounts and scores.
pub const EPSILON: f64 = 1e-9;

/// Per-node scores produced by a placement algorithm, lower is better.
///
/// A `BTreeMap` keeps iteration in lexicographic node order, which makes the
/// argmin tie-break deterministic.
pub type Scores = BTreeMap<String, f64>;

/// Returns the node with the minimum score.
///
/// Ties are broken towards the lexicographically smallest node name.
pub fn arg_min(scores: &Scores) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (name, &score) in scores {
        match best {
            Some((_, best_score)) if score >= best_score => {}
            _ => best = Some((name, score)),
        }
    }
    best.map(|(name, _)| name.clone())
}

/// Describes a result of checking whether a workload fits on a node.
#[derive(Debug, PartialEq, Eq)]
pub enum FitVerdict {
    NotEnoughCpu,
    NotEnoughMemory,
    Success,
}
