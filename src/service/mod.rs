//! Service lifecycle and its persisted running flag.

pub mod runner;
pub mod status;

pub use runner::{build_services, run_once, SosService};
pub use status::ServiceStatus;
