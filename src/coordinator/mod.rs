//! Concurrency coordinator
//!
//! Serializes operations per filesystem target across process boundaries
//! and detects lost updates for writers. Hybrid scheme: an exclusive
//! cross-process lock file per target plus an optimistic timestamp check
//! gating write bodies. The lock makes no read/write distinction; reads
//! against the same target serialize too, which keeps the protocol simple
//! at the cost of read throughput.

mod lock;
mod snapshot;

pub use lock::{LockGuard, acquire, marker_path};
pub use snapshot::Snapshot;

use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LockError;

/// Whether the wrapped operation mutates the target.
///
/// Write mode adds the pre/post timestamp comparison; the lock itself is
/// exclusive either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

/// Lock acquisition budgets and staleness thresholds.
///
/// Writes get the longer wait budget: they are assumed less frequent than
/// reads but costlier for the caller to retry.
#[derive(Debug, Clone)]
pub struct LockSettings {
    pub read_wait: Duration,
    pub write_wait: Duration,
    pub stale_after: Duration,
    pub retry_delay: Duration,
}

impl LockSettings {
    fn budget(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Read => self.read_wait,
            Mode::Write => self.write_wait,
        }
    }
}

/// The filesystem entity actually locked for an operation against `target`:
/// the target itself if it exists, else its nearest existing ancestor
/// directory (a non-existent entity cannot hold a lock marker).
pub fn lock_target_for(target: &Path) -> PathBuf {
    for ancestor in target.ancestors() {
        if ancestor.exists() {
            return ancestor.to_path_buf();
        }
    }
    // ancestors() always ends at a filesystem root, which exists
    PathBuf::from("/")
}

/// Run `f` with exclusive coordination on `target`.
///
/// Write mode captures a snapshot of the target's mtime before requesting
/// the lock and re-reads it once the lock is held; on any difference the
/// body never runs and the caller gets a conflict naming `virtual_path`.
/// The lock is released on every exit path. No automatic retry: after a
/// conflict or timeout the caller is expected to re-read and resubmit.
pub fn with_coordination<T, E>(
    settings: &LockSettings,
    target: &Path,
    virtual_path: &str,
    mode: Mode,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<LockError>,
{
    let lock_target = lock_target_for(target);

    let before = match mode {
        Mode::Write => Some(Snapshot::capture(target)?),
        Mode::Read => None,
    };

    let _guard = acquire(
        &lock_target,
        settings.budget(mode),
        settings.stale_after,
        settings.retry_delay,
    )?;
    debug!(
        "Acquired {:?} lock for {} (target: {})",
        mode,
        virtual_path,
        lock_target.display()
    );

    if let Some(before) = before {
        let after = Snapshot::capture(target)?;
        if after != before {
            return Err(LockError::Conflict(virtual_path.to_string()).into());
        }
    }

    f()
}

/// Two-target variant of `with_coordination` for rename.
///
/// Locks both the source and destination lock targets so a concurrent
/// operation against the destination path cannot interleave. Targets are
/// acquired in path order, so two renames in opposite directions cannot
/// deadlock; when both paths resolve to the same lock target only one lock
/// is taken. The conflict check uses the source snapshot, since the source
/// is the entity being mutated.
pub fn with_coordination_pair<T, E>(
    settings: &LockSettings,
    source: &Path,
    source_virtual: &str,
    dest: &Path,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    E: From<LockError>,
{
    let source_target = lock_target_for(source);
    let dest_target = lock_target_for(dest);

    let before = Snapshot::capture(source)?;

    let budget = settings.write_wait;
    let (first, second) = if source_target <= dest_target {
        (&source_target, &dest_target)
    } else {
        (&dest_target, &source_target)
    };

    let _first_guard = acquire(first, budget, settings.stale_after, settings.retry_delay)?;
    let _second_guard = if second != first {
        Some(acquire(
            second,
            budget,
            settings.stale_after,
            settings.retry_delay,
        )?)
    } else {
        None
    };
    debug!(
        "Acquired rename locks for {} (targets: {}, {})",
        source_virtual,
        first.display(),
        second.display()
    );

    let after = Snapshot::capture(source)?;
    if after != before {
        return Err(LockError::Conflict(source_virtual.to_string()).into());
    }

    f()
}
