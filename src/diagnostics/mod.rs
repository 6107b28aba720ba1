//! Diagnostics sink
//!
//! Records operation timing and outcome to a debug log shared by every
//! instance using the same storage root. Events go onto an unbounded
//! channel drained by a single writer thread, so emitting never blocks an
//! operation and lines from concurrent commands never interleave. Send and
//! write failures are ignored; diagnostics must never abort the operation
//! that produced them.

use log::debug;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

/// One completed operation, as seen by the sink.
#[derive(Debug)]
pub struct DiagnosticEvent {
    pub operation: &'static str,
    pub path: String,
    pub outcome: String,
    pub elapsed_ms: u128,
}

/// Cloneable producer half handed to the operations layer.
#[derive(Clone)]
pub struct DiagnosticsHandle {
    tx: mpsc::Sender<DiagnosticEvent>,
    instance: String,
}

impl DiagnosticsHandle {
    /// Fire-and-forget: a dropped writer thread just means the event is lost.
    pub fn record(&self, event: DiagnosticEvent) {
        let _ = self.tx.send(event);
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }
}

/// Spawn the single writer thread and return the producer handle.
///
/// The correlation token distinguishes log output across instances running
/// concurrently against the same root. Generated once at startup, read-only
/// afterwards.
pub fn spawn(log_path: PathBuf) -> DiagnosticsHandle {
    let instance = instance_token();
    let (tx, rx) = mpsc::channel::<DiagnosticEvent>();

    let writer_instance = instance.clone();
    thread::spawn(move || {
        for event in rx {
            let line = format!(
                "{} [{}] {} {} {} {}ms\n",
                unix_millis(),
                writer_instance,
                event.operation,
                event.path,
                event.outcome,
                event.elapsed_ms
            );
            let written = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .and_then(|mut f| f.write_all(line.as_bytes()));
            if written.is_err() {
                // Best-effort only
                debug!("Dropped diagnostic line for {}", event.path);
            }
        }
    });

    DiagnosticsHandle { tx, instance }
}

/// Startup timestamp plus a random suffix.
fn instance_token() -> String {
    format!("{}-{:04x}", unix_millis(), rand::random::<u16>())
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
