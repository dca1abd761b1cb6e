//! Client Types
//!
//! Data structures shared across the request pipeline.

pub mod config;
pub mod credential;
pub mod request;
pub mod response;
pub mod token;

pub use config::*;
pub use credential::*;
pub use request::*;
pub use response::*;
pub use token::*;
