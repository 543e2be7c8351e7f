//! Shared tracing setup for the chamados crates

pub mod config;
pub mod init;

pub use config::{InstrumentationConfig, default_data_dir};
pub use init::init_tracing;
