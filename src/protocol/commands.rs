//! Module `commands`
//!
//! Defines the command surface of the store and related data structures
//! used to represent commands, their status, and results.

use serde::Deserialize;

/// A structured command received from the transport.
///
/// Each variant corresponds to one store operation. Wire shape is a JSON
/// object tagged by `"command"`; shape validation (required fields, types)
/// happens entirely at deserialization.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    View {
        path: String,
        #[serde(default)]
        view_range: Option<(i64, i64)>,
    },
    Create {
        path: String,
        file_text: String,
    },
    StrReplace {
        path: String,
        old_str: String,
        new_str: String,
    },
    Insert {
        path: String,
        insert_line: i64,
        insert_text: String,
    },
    Delete {
        path: String,
    },
    Rename {
        old_path: String,
        new_path: String,
    },
}

impl Command {
    /// Operation name as recorded by diagnostics.
    pub fn operation(&self) -> &'static str {
        match self {
            Command::View { .. } => "view",
            Command::Create { .. } => "create",
            Command::StrReplace { .. } => "str_replace",
            Command::Insert { .. } => "insert",
            Command::Delete { .. } => "delete",
            Command::Rename { .. } => "rename",
        }
    }

    /// Primary virtual path the command targets.
    pub fn primary_path(&self) -> &str {
        match self {
            Command::View { path, .. }
            | Command::Create { path, .. }
            | Command::StrReplace { path, .. }
            | Command::Insert { path, .. }
            | Command::Delete { path } => path,
            Command::Rename { old_path, .. } => old_path,
        }
    }
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Success,
    Failure(String),
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: String,
}

impl CommandResult {
    pub fn success(message: String) -> Self {
        Self {
            status: CommandStatus::Success,
            message,
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            status: CommandStatus::Failure(message.clone()),
            message,
        }
    }
}

/// Parses one raw request line into the `Command` enum.
pub fn parse_command(raw: &str) -> Result<Command, serde_json::Error> {
    serde_json::from_str(raw.trim())
}
