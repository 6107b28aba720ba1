//! Command handlers module for the memory store server.
//!
//! Dispatches parsed commands to the store operations, times each call,
//! and reports the outcome to the diagnostics sink.

use log::{error, info};
use std::time::Instant;

use crate::diagnostics::DiagnosticEvent;
use crate::protocol::commands::{Command, CommandResult};
use crate::store::{self, StoreContext};

/// Dispatches a received command to its corresponding store operation.
///
/// Every error is surfaced verbatim in the failure message; the calling
/// agent parses these texts to decide whether to retry. Diagnostics
/// emission is fire-and-forget and cannot fail the command.
pub fn handle_command(ctx: &StoreContext, command: Command) -> CommandResult {
    let operation = command.operation();
    let path = command.primary_path().to_string();
    let started = Instant::now();

    let result = match command {
        Command::View { path, view_range } => store::view(ctx, &path, view_range),
        Command::Create { path, file_text } => store::create(ctx, &path, &file_text),
        Command::StrReplace {
            path,
            old_str,
            new_str,
        } => store::str_replace(ctx, &path, &old_str, &new_str),
        Command::Insert {
            path,
            insert_line,
            insert_text,
        } => store::insert(ctx, &path, insert_line, &insert_text),
        Command::Delete { path } => store::delete(ctx, &path),
        Command::Rename { old_path, new_path } => store::rename(ctx, &old_path, &new_path),
    };

    let elapsed_ms = started.elapsed().as_millis();
    match result {
        Ok(message) => {
            info!("{} {} completed in {}ms", operation, path, elapsed_ms);
            ctx.diagnostics().record(DiagnosticEvent {
                operation,
                path,
                outcome: "ok".to_string(),
                elapsed_ms,
            });
            CommandResult::success(message)
        }
        Err(e) => {
            error!("{} {} failed: {}", operation, path, e);
            ctx.diagnostics().record(DiagnosticEvent {
                operation,
                path,
                outcome: format!("error: {}", e),
                elapsed_ms,
            });
            CommandResult::failure(e.to_string())
        }
    }
}
