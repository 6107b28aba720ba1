//! Response serialization
//!
//! Wire shape of command results: one JSON object per line.

use serde::Serialize;

use crate::protocol::commands::{CommandResult, CommandStatus};

#[derive(Debug, Serialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

impl Response {
    pub fn ok(message: String) -> Self {
        Self {
            status: "ok",
            message,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            status: "error",
            message,
        }
    }

    pub fn from_result(result: CommandResult) -> Self {
        match result.status {
            CommandStatus::Success => Response::ok(result.message),
            CommandStatus::Failure(message) => Response::error(message),
        }
    }

    /// One newline-terminated JSON line.
    pub fn to_json_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":"error","message":"response serialization failed"}"#.to_string()
        });
        line.push('\n');
        line
    }
}
