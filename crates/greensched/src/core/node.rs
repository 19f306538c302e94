//! Compute nodes and their reservation bookkeeping.

use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::core::ci_profile::CiProfile;
use crate::core::common::{FitVerdict, EPSILON};
use crate::core::site::Site;
use crate::core::workload::Workload;

/// Default peak power draw assumed when a node does not report one.
pub const DEFAULT_PEAK_POWER_W: f64 = 400.0;

/// A node-local record of a running job. Owned exclusively by its node.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    /// Instant at which the reserved resources are returned.
    pub end_time: f64,
    /// CPU amount held by this reservation.
    pub cpu: f64,
    /// Memory amount held by this reservation.
    pub memory: f64,
}

/// A compute node: capacity, live availability, carbon-intensity profile and
/// an optional site reference.
///
/// Invariant: `0 <= available <= total` for both resources, with the
/// difference equal to the sum over active reservations.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    cpu_total: f64,
    memory_total: f64,
    cpu_available: f64,
    memory_available: f64,
    /// Last-known carbon intensity in gCO₂/kWh; serves as the live value for
    /// `randwalk` profiles and as the fallback for unknown profiles.
    carbon_intensity: f64,
    ci_profile: CiProfile,
    site: Option<Rc<Site>>,
    metadata: HashMap<String, String>,
    reservations: Vec<Reservation>,
}

impl Node {
    /// Creates an idle node. The live carbon intensity is seeded from the
    /// profile baseline.
    pub fn new(name: &str, cpu_total: f64, memory_total: f64, ci_profile: &str) -> Self {
        let profile = CiProfile::parse(ci_profile);
        Self {
            name: name.to_string(),
            cpu_total,
            memory_total,
            cpu_available: cpu_total,
            memory_available: memory_total,
            carbon_intensity: profile.baseline(),
            ci_profile: profile,
            site: None,
            metadata: HashMap::new(),
            reservations: Vec::new(),
        }
    }

    pub fn with_site(mut self, site: Rc<Site>) -> Self {
        self.site = Some(site);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpu_total(&self) -> f64 {
        self.cpu_total
    }

    pub fn memory_total(&self) -> f64 {
        self.memory_total
    }

    pub fn cpu_available(&self) -> f64 {
        self.cpu_available
    }

    pub fn memory_available(&self) -> f64 {
        self.memory_available
    }

    pub fn site(&self) -> Option<&Rc<Site>> {
        self.site.as_ref()
    }

    pub fn ci_profile(&self) -> &CiProfile {
        &self.ci_profile
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Last-known carbon intensity, used by `randwalk` and unknown profiles.
    pub fn carbon_intensity(&self) -> f64 {
        self.carbon_intensity
    }

    /// Updates the live carbon intensity; called by external drivers.
    pub fn set_carbon_intensity(&mut self, value: f64) {
        self.carbon_intensity = value;
    }

    /// Evaluates the node's carbon-intensity profile at `time`.
    pub fn current_ci(&self, time: f64) -> f64 {
        self.ci_profile.value_at(time, self.carbon_intensity)
    }

    /// Peak power draw in watts from node metadata, with a default for
    /// missing or non-positive values.
    pub fn peak_power_w(&self) -> f64 {
        self.metadata
            .get("peak_power_w")
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|&value| value > 0.)
            .unwrap_or(DEFAULT_PEAK_POWER_W)
    }

    /// True iff the node currently has enough free CPU and memory.
    pub fn can_accept(&self, workload: &Workload) -> bool {
        self.fit_verdict(workload) == FitVerdict::Success
    }

    pub fn fit_verdict(&self, workload: &Workload) -> FitVerdict {
        if self.cpu_available < workload.cpu {
            return FitVerdict::NotEnoughCpu;
        }
        if self.memory_available < workload.memory {
            return FitVerdict::NotEnoughMemory;
        }
        FitVerdict::Success
    }

    /// Consumes capacity for `workload` and records a reservation ending at
    /// `start + duration`. The caller must have checked [`Node::can_accept`].
    pub fn reserve(&mut self, workload: &Workload, start: f64) {
        debug_assert!(self.can_accept(workload), "reserve on infeasible node {}", self.name);
        self.cpu_available -= workload.cpu;
        self.memory_available -= workload.memory;
        debug_assert!(self.cpu_available >= -EPSILON && self.memory_available >= -EPSILON);
        self.reservations.push(Reservation {
            end_time: workload.end_time(start),
            cpu: workload.cpu,
            memory: workload.memory,
        });
    }

    /// Returns resources of all reservations ending at or before `time`,
    /// clamped to the node totals. Returns the number of freed reservations.
    pub fn release(&mut self, time: f64) -> usize {
        let before = self.reservations.len();
        let mut cpu_available = self.cpu_available;
        let mut memory_available = self.memory_available;
        self.reservations.retain(|r| {
            if r.end_time <= time {
                cpu_available = (cpu_available + r.cpu).min(self.cpu_total);
                memory_available = (memory_available + r.memory).min(self.memory_total);
                false
            } else {
                true
            }
        });
        self.cpu_available = cpu_available;
        self.memory_available = memory_available;
        before - self.reservations.len()
    }

    /// The earliest reservation end strictly after `time`, if any.
    pub fn next_release_after(&self, time: f64) -> Option<f64> {
        self.reservations
            .iter()
            .filter(|r| r.end_time > time)
            .map(|r| r.end_time)
            .fold(None, |acc, end| match acc {
                Some(best) if best <= end => Some(best),
                _ => Some(end),
            })
    }

    /// Seconds from `time` until the node could accept `workload`: zero if it
    /// already can, otherwise the earliest reservation end that frees enough
    /// resources. `None` if no sequence of releases ever makes it fit.
    pub fn time_to_fit(&self, workload: &Workload, time: f64) -> Option<f64> {
        if self.can_accept(workload) {
            return Some(0.);
        }
        let mut ends: Vec<&Reservation> = self.reservations.iter().collect();
        ends.sort_by(|a, b| a.end_time.total_cmp(&b.end_time));
        let mut cpu = self.cpu_available;
        let mut memory = self.memory_available;
        for r in ends {
            cpu = (cpu + r.cpu).min(self.cpu_total);
            memory = (memory + r.memory).min(self.memory_total);
            if cpu >= workload.cpu && memory >= workload.memory {
                return Some((r.end_time - time).max(0.));
            }
        }
        None
    }

    /// Fraction of CPU capacity currently reserved, zero for a zero-capacity
    /// node.
    pub fn cpu_load(&self) -> f64 {
        if self.cpu_total > 0. {
            (self.cpu_total - self.cpu_available) / self.cpu_total
        } else {
            0.
        }
    }

    /// Fraction of memory capacity currently reserved.
    pub fn memory_load(&self) -> f64 {
        if self.memory_total > 0. {
            (self.memory_total - self.memory_available) / self.memory_total
        } else {
            0.
        }
    }

    /// Combined CPU + memory load, the spread/pack score used by the
    /// utilisation-driven policies. Ranges over `[0, 2]`.
    pub fn utilization(&self) -> f64 {
        self.cpu_load() + self.memory_load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(cpu: f64, memory: f64, duration: f64) -> Workload {
        Workload::new("j", 0., duration, cpu, memory)
    }

    #[test]
    fn reserve_and_release_round_trip() {
        let mut node = Node::new("n1", 16., 32., "static:100");
        let w = job(8., 16., 60.);
        assert!(node.can_accept(&w));
        node.reserve(&w, 0.);
        assert_eq!(node.cpu_available(), 8.);
        assert_eq!(node.memory_available(), 16.);
        assert_eq!(node.reservations().len(), 1);

        assert_eq!(node.release(59.), 0);
        assert_eq!(node.release(60.), 1);
        assert_eq!(node.cpu_available(), 16.);
        assert_eq!(node.memory_available(), 32.);
        assert!(node.reservations().is_empty());
    }

    #[test]
    fn release_is_idempotent() {
        let mut node = Node::new("n1", 16., 32., "static:100");
        node.reserve(&job(8., 16., 10.), 0.);
        assert_eq!(node.release(10.), 1);
        assert_eq!(node.release(10.), 0);
        assert_eq!(node.cpu_available(), 16.);
        assert_eq!(node.memory_available(), 32.);
    }

    #[test]
    fn next_release_after_returns_earliest_future_end() {
        let mut node = Node::new("n1", 16., 32., "static:100");
        node.reserve(&job(2., 2., 30.), 0.);
        node.reserve(&job(2., 2., 10.), 0.);
        node.reserve(&job(2., 2., 20.), 0.);
        assert_eq!(node.next_release_after(0.), Some(10.));
        assert_eq!(node.next_release_after(10.), Some(20.));
        assert_eq!(node.next_release_after(30.), None);
    }

    #[test]
    fn time_to_fit_walks_release_order() {
        let mut node = Node::new("n1", 16., 32., "static:100");
        node.reserve(&job(10., 10., 30.), 0.);
        node.reserve(&job(4., 4., 50.), 0.);
        let big = job(12., 12., 5.);
        // free now: 2/18; after t=30: 12/28 -> fits
        assert_eq!(node.time_to_fit(&big, 0.), Some(30.));
        let small = job(1., 1., 5.);
        assert_eq!(node.time_to_fit(&small, 0.), Some(0.));
        let never = job(20., 1., 5.);
        assert_eq!(node.time_to_fit(&never, 0.), None);
    }

    #[test]
    fn zero_capacity_node_is_never_feasible_and_has_zero_load() {
        let node = Node::new("n0", 0., 0., "static:100");
        assert!(!node.can_accept(&job(1., 1., 1.)));
        assert_eq!(node.utilization(), 0.);
    }

    #[test]
    fn peak_power_defaults() {
        let node = Node::new("n1", 16., 32., "static:100");
        assert_eq!(node.peak_power_w(), DEFAULT_PEAK_POWER_W);
        let node = Node::new("n1", 16., 32., "static:100").with_metadata("peak_power_w", "250");
        assert_eq!(node.peak_power_w(), 250.);
        let node = Node::new("n1", 16., 32., "static:100").with_metadata("peak_power_w", "-5");
        assert_eq!(node.peak_power_w(), DEFAULT_PEAK_POWER_W);
        let node = Node::new("n1", 16., 32., "static:100").with_metadata("peak_power_w", "watts");
        assert_eq!(node.peak_power_w(), DEFAULT_PEAK_POWER_W);
    }
}
