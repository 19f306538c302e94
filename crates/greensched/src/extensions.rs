//! Extensions around the core: trace input, log output, synthetic data and
//! carbon-intensity drivers.

pub mod ci_driver;
pub mod csv_trace;
pub mod log_export;
pub mod workload_generator;
