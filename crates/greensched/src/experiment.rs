//! Tools for running parameter sweeps with multiple simulation runs.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use threadpool::ThreadPool;

use crate::core::config::SimulationConfig;
use crate::core::log_entry::LogEntry;
use crate::core::workload::Workload;
use crate::simulation::ClusterSimulation;

/// Aggregated metrics of one simulation run within a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    /// Carbon weight applied to the policy for this run.
    pub ci_weight: f64,
    /// Batch size used for this run.
    pub batch_size: usize,
    /// Policy name.
    pub scheduler: String,
    /// Mean queueing delay in seconds over placed jobs.
    pub avg_wait_s: f64,
    /// Mean run duration in seconds over placed jobs.
    pub avg_runtime_s: f64,
    /// Total emissions in grams CO₂ over placed jobs.
    pub total_ci_cost: f64,
    /// Wall-clock solve time per placed job in milliseconds.
    pub avg_solve_ms: f64,
}

/// One completed run: its summary row plus the full placement log.
#[derive(Debug, Clone)]
pub struct SweepRun {
    pub summary: SweepSummary,
    pub log: Vec<LogEntry>,
}

/// Sweeps the (policy, carbon weight, batch size) grid over a fixed workload
/// stream. Each grid point gets a fresh simulation built from the base
/// config; only the swept knobs differ between runs.
pub struct SweepExperiment {
    base_config: SimulationConfig,
    policies: Vec<String>,
    ci_weights: Vec<f64>,
    batch_sizes: Vec<usize>,
    workloads: Arc<Vec<Workload>>,
}

impl SweepExperiment {
    pub fn new(
        base_config: SimulationConfig,
        policies: Vec<String>,
        ci_weights: Vec<f64>,
        batch_sizes: Vec<usize>,
        workloads: Vec<Workload>,
    ) -> Self {
        Self {
            base_config,
            policies,
            ci_weights,
            batch_sizes,
            workloads: Arc::new(workloads),
        }
    }

    /// Runs the whole grid using the specified number of threads and returns
    /// the runs ordered by (ci_weight, batch_size, policy) grid position.
    ///
    /// The engine itself stays single-threaded; parallelism only exists
    /// between independent runs, and wall-clock timing happens out here on
    /// the driver side.
    pub fn run(&self, num_threads: usize) -> Vec<SweepRun> {
        let results = Arc::new(Mutex::new(Vec::new()));
        let pool = ThreadPool::new(num_threads.max(1));
        let mut run_id: usize = 0;

        for &ci_weight in &self.ci_weights {
            for &batch_size in &self.batch_sizes {
                for policy in &self.policies {
                    let mut config = self.base_config.clone();
                    config.policy = policy.clone();
                    config.batch_size = batch_size;
                    config.ci_base_weight = ci_weight;
                    config.carbon_weight = ci_weight;
                    config.lambda = ci_weight;

                    let workloads = self.workloads.clone();
                    let results = results.clone();
                    pool.execute(move || {
                        let run = run_single(config, ci_weight, batch_size, &workloads);
                        results.lock().unwrap().push((run_id, run));
                    });
                    run_id += 1;
                }
            }
        }

        pool.join();
        let mut runs = Arc::try_unwrap(results).unwrap().into_inner().unwrap();
        runs.sort_by_key(|(id, _)| *id);
        runs.into_iter().map(|(_, run)| run).collect()
    }
}

fn run_single(
    config: SimulationConfig,
    ci_weight: f64,
    batch_size: usize,
    workloads: &[Workload],
) -> SweepRun {
    let mut sim = ClusterSimulation::new(&config);
    for workload in workloads {
        sim.add_workload(workload.clone());
    }
    let started = Instant::now();
    sim.run();
    let solve_ms = started.elapsed().as_secs_f64() * 1000.;

    let log = sim.logs().to_vec();
    let placed = log.len() as f64;
    let (mut sum_wait, mut sum_runtime, mut sum_ci) = (0., 0., 0.);
    for entry in &log {
        sum_wait += entry.wait_ms as f64 / 1000.;
        sum_runtime += entry.end - entry.start;
        sum_ci += entry.ci_cost;
    }

    SweepRun {
        summary: SweepSummary {
            ci_weight,
            batch_size,
            scheduler: sim.policy_name().to_string(),
            avg_wait_s: if placed > 0. { sum_wait / placed } else { 0. },
            avg_runtime_s: if placed > 0. { sum_runtime / placed } else { 0. },
            total_ci_cost: sum_ci,
            avg_solve_ms: if placed > 0. { solve_ms / placed } else { 0. },
        },
        log,
    }
}
