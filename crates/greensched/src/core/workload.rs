//! Workload (job) specification.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A job submitted to the cluster: fixed resource demand for a fixed duration.
///
/// Workloads are immutable once submitted; the engine only clones them into
/// events and log entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    /// Stable job identifier.
    pub id: String,
    /// Submission instant in seconds.
    pub submit_time: f64,
    /// Requested run duration in seconds.
    pub duration: f64,
    /// Requested CPU amount (cores, fungible within a node).
    pub cpu: f64,
    /// Requested memory amount.
    pub memory: f64,
    /// Optional labels attached by the submitter.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl Workload {
    pub fn new(id: &str, submit_time: f64, duration: f64, cpu: f64, memory: f64) -> Self {
        Self {
            id: id.to_string(),
            submit_time,
            duration,
            cpu,
            memory,
            labels: HashMap::new(),
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    /// Job completion instant for a run starting at `start`.
    pub fn end_time(&self, start: f64) -> f64 {
        start + self.duration
    }
}
