//! Builders
//!
//! Fluent builders for client configuration.

pub mod config;

pub use config::{api_client_config, ClientConfigBuilder};
