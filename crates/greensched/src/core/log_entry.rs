//! Placement decision records.

use serde::Serialize;

/// An immutable record of one successful placement, appended by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Job identifier.
    pub job_id: String,
    /// Name of the node the job was placed on.
    pub node: String,
    /// Submission instant in seconds.
    pub submit: f64,
    /// Start instant in seconds.
    pub start: f64,
    /// Completion instant in seconds.
    pub end: f64,
    /// Queueing delay in whole milliseconds.
    pub wait_ms: i64,
    /// Estimated emissions of this placement in grams CO₂.
    pub ci_cost: f64,
}
