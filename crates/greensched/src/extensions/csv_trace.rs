//! CSV readers for node fleets, workload traces and sites.
//!
//! Node records: `name,cpu,mem,ci_profile[,site_id[,peak_power_w]]`.
//! Workload records: `id,submit,cpu,mem,duration,tag` with RFC3339 submit
//! instants and durations in seconds.
//! Site records: `id,pue,k,region`.
//!
//! Readers produce plain config records so that loaded inputs can be carried
//! across threads and fed to
//! [`ClusterSimulation::new`](crate::simulation::ClusterSimulation::new).

use std::error::Error;
use std::fs::File;
use std::path::Path;

use chrono::DateTime;
use csv::ReaderBuilder;
use serde::Deserialize;

use crate::core::config::{NodeConfig, SiteConfig};
use crate::core::workload::Workload;

#[derive(Debug, Deserialize)]
struct NodeRecord {
    name: String,
    cpu: f64,
    mem: f64,
    ci_profile: String,
    #[serde(default)]
    site_id: Option<String>,
    #[serde(default)]
    peak_power_w: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkloadRecord {
    id: String,
    submit: String,
    cpu: f64,
    mem: f64,
    duration: f64,
    #[serde(default)]
    tag: Option<String>,
}

/// Loads site records.
pub fn load_sites_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<SiteConfig>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(File::open(path)?);
    let mut sites = Vec::new();
    for record in reader.deserialize() {
        let site: SiteConfig = record?;
        sites.push(site);
    }
    Ok(sites)
}

/// Loads the node fleet as config records. A non-numeric `peak_power_w`
/// column is dropped so that the documented default applies downstream.
pub fn load_nodes_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<NodeConfig>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(File::open(path)?);
    let mut nodes = Vec::new();
    for record in reader.deserialize() {
        let record: NodeRecord = record?;
        nodes.push(NodeConfig {
            name: Some(record.name),
            name_prefix: None,
            cpus: record.cpu,
            memory: record.mem,
            ci_profile: record.ci_profile,
            site: record.site_id.filter(|id| !id.is_empty()),
            peak_power_w: record.peak_power_w.and_then(|raw| raw.parse::<f64>().ok()),
            count: None,
        });
    }
    Ok(nodes)
}

/// Loads a workload trace; the optional tag lands in the workload labels.
pub fn load_workloads_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Workload>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(File::open(path)?);
    let mut workloads = Vec::new();
    for record in reader.deserialize() {
        let record: WorkloadRecord = record?;
        let submit = parse_rfc3339_secs(&record.submit)?;
        let mut workload = Workload::new(&record.id, submit, record.duration, record.cpu, record.mem);
        if let Some(tag) = record.tag {
            if !tag.is_empty() {
                workload = workload.with_label("tag", &tag);
            }
        }
        workloads.push(workload);
    }
    Ok(workloads)
}

/// Parses an RFC3339 instant into seconds since the Unix epoch.
pub fn parse_rfc3339_secs(raw: &str) -> Result<f64, Box<dyn Error>> {
    let instant = DateTime::parse_from_rfc3339(raw)?;
    Ok(instant.timestamp() as f64 + instant.timestamp_subsec_nanos() as f64 / 1e9)
}
