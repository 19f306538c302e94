//! Simulation events.

use std::cmp::Ordering;

use serde::Serialize;

use crate::core::workload::Workload;

/// Event identifier, assigned sequentially by the engine.
pub type EventId = u64;

/// What happens at an event instant.
#[derive(Debug, Clone, Serialize)]
pub enum EventKind {
    /// A workload reaches its submission instant.
    JobArrival { workload: Workload },
    /// A placed workload finishes on `node`; its resources are returned by
    /// the release phase at this instant.
    JobEnd { workload: Workload, node: String },
}

/// An element of the simulation timeline.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Sequential identifier; equal-time events are processed in insertion
    /// order.
    pub id: EventId,
    /// Occurrence instant.
    pub time: f64,
    pub kind: EventKind,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.time.total_cmp(&self.time).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BinaryHeap;

    use super::*;

    fn arrival(id: EventId, time: f64) -> Event {
        Event {
            id,
            time,
            kind: EventKind::JobArrival {
                workload: Workload::new(&format!("j{}", id), time, 1., 1., 1.),
            },
        }
    }

    #[test]
    fn heap_pops_in_time_order() {
        let mut heap = BinaryHeap::new();
        heap.push(arrival(0, 5.));
        heap.push(arrival(1, 1.));
        heap.push(arrival(2, 3.));
        let order: Vec<f64> = std::iter::from_fn(|| heap.pop()).map(|e| e.time).collect();
        assert_eq!(order, vec![1., 3., 5.]);
    }

    #[test]
    fn equal_times_pop_in_insertion_order() {
        let mut heap = BinaryHeap::new();
        for id in 0..10 {
            heap.push(arrival(id, 2.));
        }
        let order: Vec<EventId> = std::iter::from_fn(|| heap.pop()).map(|e| e.id).collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }
}
