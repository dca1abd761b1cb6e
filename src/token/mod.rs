//! Token Management
//!
//! Bearer token caching and token endpoint exchanges.

pub mod cache;
pub mod exchange;

pub use cache::*;
pub use exchange::*;
