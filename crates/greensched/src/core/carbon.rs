//! Carbon-cost model.
//!
//! Converts "workload `w` runs on node `n` starting at `t`" into grams of
//! CO₂. Pure function of its inputs: the node's carbon-intensity profile at
//! the start instant, a linear power model derived from the node's peak
//! draw, the workload's CPU share and duration, and the site PUE and
//! calibration factor.

use crate::core::node::Node;
use crate::core::power_model::{HostPowerModel, LinearPowerModel};
use crate::core::workload::Workload;

/// Estimated emissions in grams CO₂ for running `workload` on `node`
/// starting at `start`, under the node's own linear power model.
pub fn carbon_cost(node: &Node, workload: &Workload, start: f64) -> f64 {
    carbon_cost_with_model(node, workload, start, &LinearPowerModel::from_peak(node.peak_power_w()))
}

/// Same as [`carbon_cost`] but with an explicit power model.
pub fn carbon_cost_with_model(
    node: &Node,
    workload: &Workload,
    start: f64,
    model: &dyn HostPowerModel,
) -> f64 {
    let ci = node.current_ci(start);
    let cpu_share = if node.cpu_total() > 0. {
        workload.cpu / node.cpu_total()
    } else {
        0.
    };
    let power_w = model.power(cpu_share);
    let energy_kwh = power_w * workload.duration.max(0.) / 3600. / 1000.;
    let (pue, k) = match node.site() {
        Some(site) => (site.effective_pue(), site.effective_k()),
        None => (1.0, 1.0),
    };
    energy_kwh * ci * pue * k
}
