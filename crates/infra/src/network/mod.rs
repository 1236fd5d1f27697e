//! Connectivity probing

pub mod probe;

pub use probe::{probe_from_config, HttpConnectivityProbe};
