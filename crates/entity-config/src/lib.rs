//! Layered configuration loading (env + optional file) and the shared
//! `tracing` setup both binaries use, grounded on the fleet daemon's
//! `config.rs` three-source builder pattern.

mod agent;
mod logging;
mod observer;

pub use agent::AgentConfig;
pub use logging::{init_tracing, LoggingConfig};
pub use observer::ObserverConfig;
