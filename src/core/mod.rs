//! Core Components
//!
//! HTTP transport and the executing client.

pub mod http;
pub mod transport;

pub use http::*;
pub use transport::*;
