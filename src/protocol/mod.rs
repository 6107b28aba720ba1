//! Protocol module
//!
//! Command parsing, dispatch, and response serialization for the
//! line-delimited JSON transport.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, CommandResult, CommandStatus, parse_command};
pub use handlers::handle_command;
pub use responses::Response;
