//! Min-cost-flow batch assignment algorithm.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::rc::Rc;

use crate::core::common::{Scores, EPSILON};
use crate::core::config::parse_options;
use crate::core::node::Node;
use crate::core::placement_algorithm::PlacementAlgorithm;
use crate::core::workload::Workload;

/// Multiplier applied to real-valued costs before rounding to solver
/// integers. Integral costs keep shortest-path comparisons exact, so the
/// solver cannot be tipped by floating-point noise.
pub const COST_QUANTIZATION: f64 = 1000.0;

/// Assigns a whole batch of jobs at once by solving a min-cost max-flow
/// problem over a four-layer network: source → jobs → nodes → sink, plus an
/// "unscheduled" fallback vertex so that every job always has a path.
///
/// A job→node edge exists only when the node can currently accept the job
/// and costs `-(cpu·totalCpu + mem·totalMem) + w_ci · ci`, favouring
/// large-capacity nodes for large jobs and penalising carbon-intense nodes.
/// The carbon weight is inflated when intensities across the fleet are
/// volatile: `w_ci = base · (1 + alpha · stddev/mean)`.
///
/// Outside of batch flushes (release-phase backfill) the same quantised cost
/// serves as a greedy per-job score.
pub struct MinCostFlow {
    ci_base_weight: f64,
    ci_dyn_alpha: f64,
}

impl MinCostFlow {
    pub fn new(ci_base_weight: f64, ci_dyn_alpha: f64) -> Self {
        Self {
            ci_base_weight,
            ci_dyn_alpha,
        }
    }

    /// Builds the policy from an options string such as
    /// `ci_weight=0.1,alpha=1.0`.
    pub fn from_options(options_str: &str) -> Self {
        let options = parse_options(options_str);
        let parse = |key: &str, default: f64| {
            options
                .get(key)
                .and_then(|raw| raw.parse::<f64>().ok())
                .unwrap_or(default)
        };
        Self::new(parse("ci_weight", 0.1), parse("alpha", 1.0))
    }

    /// Carbon weight inflated by the coefficient of variation of the current
    /// intensities across the fleet.
    fn dynamic_ci_weight(&self, nodes: &[Rc<RefCell<Node>>], time: f64) -> f64 {
        if nodes.is_empty() {
            return self.ci_base_weight;
        }
        let intensities: Vec<f64> = nodes.iter().map(|n| n.borrow().current_ci(time)).collect();
        let mean = intensities.iter().sum::<f64>() / intensities.len() as f64;
        if mean.abs() < EPSILON {
            return self.ci_base_weight;
        }
        let variance = (intensities.iter().map(|ci| ci * ci).sum::<f64>() / intensities.len() as f64
            - mean * mean)
            .max(0.);
        self.ci_base_weight * (1. + self.ci_dyn_alpha * variance.sqrt() / mean)
    }

    fn edge_cost(&self, workload: &Workload, node: &Node, ci_weight: f64, time: f64) -> i64 {
        let dot_product = workload.cpu * node.cpu_total() + workload.memory * node.memory_total();
        let raw_ci = node.current_ci(time);
        ((-dot_product + ci_weight * raw_ci) * COST_QUANTIZATION).round() as i64
    }
}

impl PlacementAlgorithm for MinCostFlow {
    fn name(&self) -> &str {
        "mcfp"
    }

    fn score(&self, workload: &Workload, nodes: &[Rc<RefCell<Node>>], time: f64) -> Scores {
        let ci_weight = self.dynamic_ci_weight(nodes, time);
        let mut scores = Scores::new();
        for node in nodes {
            let node = node.borrow();
            if node.can_accept(workload) {
                scores.insert(
                    node.name().to_string(),
                    self.edge_cost(workload, &node, ci_weight, time) as f64,
                );
            }
        }
        scores
    }

    fn assign_batch(
        &self,
        workloads: &[Workload],
        nodes: &[Rc<RefCell<Node>>],
        time: f64,
    ) -> Option<Vec<Option<usize>>> {
        let n = workloads.len();
        let m = nodes.len();
        if n == 0 {
            return Some(Vec::new());
        }

        // vertex layout: source, jobs, nodes, unscheduled, sink
        let source = 0;
        let job_offset = 1;
        let node_offset = job_offset + n;
        let unscheduled = node_offset + m;
        let sink = unscheduled + 1;
        let mut network = FlowNetwork::new(sink + 1);

        for i in 0..n {
            network.add_edge(source, job_offset + i, 1, 0);
        }

        let ci_weight = self.dynamic_ci_weight(nodes, time);
        for (i, workload) in workloads.iter().enumerate() {
            for (j, node) in nodes.iter().enumerate() {
                let node = node.borrow();
                if node.can_accept(workload) {
                    let cost = self.edge_cost(workload, &node, ci_weight, time);
                    network.add_edge(job_offset + i, node_offset + j, 1, cost);
                }
            }
            network.add_edge(job_offset + i, unscheduled, 1, 0);
        }

        for j in 0..m {
            network.add_edge(node_offset + j, sink, 1, 0);
        }
        network.add_edge(unscheduled, sink, n as i64, 0);

        network.min_cost_max_flow(source, sink);

        let mut assignment = Vec::with_capacity(n);
        for i in 0..n {
            let target = network.adj[job_offset + i]
                .iter()
                .find(|e| e.to >= node_offset && e.to < node_offset + m && e.flow > 0)
                .map(|e| e.to - node_offset);
            assignment.push(target);
        }
        Some(assignment)
    }
}

struct FlowEdge {
    to: usize,
    rev: usize,
    cap: i64,
    cost: i64,
    flow: i64,
}

/// Residual flow network solved by successive shortest augmenting paths with
/// Johnson potentials. All capacities are integral and bounded by the batch
/// size, so the augmentation loop terminates.
struct FlowNetwork {
    adj: Vec<Vec<FlowEdge>>,
}

impl FlowNetwork {
    fn new(vertex_count: usize) -> Self {
        Self {
            adj: (0..vertex_count).map(|_| Vec::new()).collect(),
        }
    }

    fn add_edge(&mut self, from: usize, to: usize, cap: i64, cost: i64) {
        let rev = self.adj[to].len();
        self.adj[from].push(FlowEdge {
            to,
            rev,
            cap,
            cost,
            flow: 0,
        });
        let rev_from = self.adj[from].len() - 1;
        self.adj[to].push(FlowEdge {
            to: from,
            rev: rev_from,
            cap: 0,
            cost: -cost,
            flow: 0,
        });
    }

    /// Valid starting potentials via Bellman-Ford, required because the
    /// job→node construction costs may be negative.
    fn init_potentials(&self, source: usize, potential: &mut [i64]) {
        let n = self.adj.len();
        let mut dist = vec![i64::MAX; n];
        dist[source] = 0;
        for _ in 0..n {
            let mut changed = false;
            for u in 0..n {
                if dist[u] == i64::MAX {
                    continue;
                }
                for e in &self.adj[u] {
                    if e.cap > e.flow && dist[u] + e.cost < dist[e.to] {
                        dist[e.to] = dist[u] + e.cost;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        for v in 0..n {
            if dist[v] < i64::MAX {
                potential[v] = dist[v];
            }
        }
    }

    fn min_cost_max_flow(&mut self, source: usize, sink: usize) -> (i64, i64) {
        let n = self.adj.len();
        let mut potential = vec![0i64; n];
        self.init_potentials(source, &mut potential);

        let mut flow = 0;
        let mut flow_cost = 0;
        loop {
            let mut dist = vec![i64::MAX; n];
            let mut prev: Vec<Option<(usize, usize)>> = vec![None; n];
            dist[source] = 0;
            let mut heap = BinaryHeap::new();
            heap.push(Reverse((0i64, source)));
            while let Some(Reverse((d, u))) = heap.pop() {
                if d > dist[u] {
                    continue;
                }
                for (ei, e) in self.adj[u].iter().enumerate() {
                    if e.cap <= e.flow {
                        continue;
                    }
                    let reduced = e.cost + potential[u] - potential[e.to];
                    let next = d + reduced;
                    if next < dist[e.to] {
                        dist[e.to] = next;
                        prev[e.to] = Some((u, ei));
                        heap.push(Reverse((next, e.to)));
                    }
                }
            }
            if dist[sink] == i64::MAX {
                break;
            }
            for v in 0..n {
                if dist[v] < i64::MAX {
                    potential[v] += dist[v];
                }
            }

            let mut bottleneck = i64::MAX;
            let mut v = sink;
            while v != source {
                let (u, ei) = prev[v].unwrap();
                let e = &self.adj[u][ei];
                bottleneck = bottleneck.min(e.cap - e.flow);
                v = u;
            }
            let mut v = sink;
            while v != source {
                let (u, ei) = prev[v].unwrap();
                let rev = self.adj[u][ei].rev;
                self.adj[u][ei].flow += bottleneck;
                flow_cost += bottleneck * self.adj[u][ei].cost;
                self.adj[v][rev].flow -= bottleneck;
                v = u;
            }
            flow += bottleneck;
        }
        (flow, flow_cost)
    }
}
