//! Run configuration of the CLI.
//!
//! A run file is read into the partial [`file::FileConfig`], `-S key=value`
//! overrides are applied on top of it, command-line flags win over both, and
//! [`defaults::DefaultsConfig`] fills whatever is still missing. The merged
//! result is validated by the core [`SimulationConfigBuilder`](mdflow::engine::config::SimulationConfigBuilder).

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

pub use builder::build_config;
pub use models::AppConfig;
