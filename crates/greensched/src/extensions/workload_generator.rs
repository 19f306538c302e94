//! Seeded synthetic fleets and workload streams.

use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::core::config::NodeConfig;
use crate::core::workload::Workload;

fn node_config(name: String, cpus: f64, memory: f64, ci_profile: String, peak_power_w: f64) -> NodeConfig {
    NodeConfig {
        name: Some(name),
        name_prefix: None,
        cpus,
        memory,
        ci_profile,
        site: None,
        peak_power_w: Some(peak_power_w),
        count: None,
    }
}

/// Builds a small heterogeneous fleet: static low-intensity nodes, a medium
/// tier, burstable nodes riding a diurnal sine profile and a pair of
/// random-walk nodes. Deterministic for a fixed seed.
pub fn generate_nodes(seed: u64) -> Vec<NodeConfig> {
    let mut rand = Pcg64::seed_from_u64(seed);
    let mut nodes = Vec::new();
    for i in 0..5 {
        nodes.push(node_config(format!("small-{}", i), 4., 8., "static:100".to_string(), 180.));
    }
    for i in 0..3 {
        let intensity = rand.gen_range(120..180);
        nodes.push(node_config(
            format!("med-{}", i),
            8.,
            16.,
            format!("static:{}", intensity),
            300.,
        ));
    }
    for i in 0..2 {
        nodes.push(node_config(
            format!("burst-{}", i),
            16.,
            32.,
            "sine:150:50:3600".to_string(),
            400.,
        ));
    }
    for i in 0..2 {
        nodes.push(node_config(
            format!("walk-{}", i),
            32.,
            64.,
            "randwalk:80:300:600".to_string(),
            600.,
        ));
    }
    nodes
}

/// Generates `count` workloads submitted over `[start, start + horizon]`
/// with uniformly drawn demands and durations. Deterministic for a fixed
/// seed.
pub fn generate_workloads(seed: u64, count: usize, start: f64, horizon: f64) -> Vec<Workload> {
    let mut rand = Pcg64::seed_from_u64(seed);
    let tags = ["batch", "service", "ml"];
    let mut workloads = Vec::with_capacity(count);
    for i in 0..count {
        let submit = start + rand.gen_range(0.0..horizon.max(1.));
        let cpu = rand.gen_range(1..=8) as f64;
        let memory = rand.gen_range(1..=16) as f64;
        let duration = rand.gen_range(30..=600) as f64;
        let tag = tags[rand.gen_range(0..tags.len())];
        workloads.push(
            Workload::new(&format!("job-{}", i), submit, duration, cpu, memory).with_label("tag", tag),
        );
    }
    workloads.sort_by(|a, b| a.submit_time.total_cmp(&b.submit_time));
    workloads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_per_seed() {
        let a = generate_workloads(42, 50, 0., 3600.);
        let b = generate_workloads(42, 50, 0., 3600.);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.submit_time, y.submit_time);
            assert_eq!(x.cpu, y.cpu);
            assert_eq!(x.memory, y.memory);
            assert_eq!(x.duration, y.duration);
        }
    }

    #[test]
    fn workloads_come_out_sorted_by_submit_time() {
        let stream = generate_workloads(7, 100, 1000., 7200.);
        for pair in stream.windows(2) {
            assert!(pair[0].submit_time <= pair[1].submit_time);
        }
    }

    #[test]
    fn fleet_has_all_tiers() {
        let fleet = generate_nodes(1);
        assert_eq!(fleet.len(), 12);
        let name = |n: &NodeConfig| n.name.clone().unwrap();
        assert!(fleet.iter().any(|n| name(n).starts_with("small-")));
        assert!(fleet.iter().any(|n| name(n).starts_with("burst-")));
        assert!(fleet.iter().any(|n| name(n).starts_with("walk-")));
    }
}
