//! Implementations of placement algorithms.

pub mod carbon_scaler;
pub mod ci_aware;
pub mod least_loaded;
pub mod min_cost_flow;
pub mod most_loaded;
