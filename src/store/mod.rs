//! File store management
//!
//! The operations engine: resolves virtual paths, coordinates access, and
//! performs the actual filesystem work for the six commands.

pub mod context;
pub mod operations;

pub use context::StoreContext;
pub use operations::{create, delete, insert, rename, str_replace, view};
