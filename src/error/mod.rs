//! Error handling
//!
//! Defines error types and handling for the memory store server.

pub mod types;

pub use types::*;
