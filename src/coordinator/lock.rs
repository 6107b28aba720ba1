//! Cross-process lock file protocol
//!
//! Advisory locking via an atomically created marker file next to the lock
//! target, with stale-marker reclamation. The marker is dot-prefixed so it
//! never shows up in directory listings. Cooperative only: processes that
//! bypass the coordinator are not stopped by it.

use fs2::FileExt;
use log::warn;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::error::LockError;

/// RAII guard for an acquired lock marker.
///
/// Dropping the guard closes the file (releasing the advisory lock) and
/// removes the marker. Runs on every exit path, including panics.
pub struct LockGuard {
    /// Open marker file; Option so Drop can take ownership.
    file: Option<File>,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
        }
        // Marker may already be gone if another process reclaimed it
        let _ = fs::remove_file(&self.path);
    }
}

/// Path of the lock marker guarding `target`: a dot-prefixed sibling.
pub fn marker_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string());
    let marker_name = format!(".{}.lock", name);
    match target.parent() {
        Some(parent) => parent.join(marker_name),
        None => PathBuf::from(marker_name),
    }
}

/// Acquire the exclusive lock for `target`, waiting up to `budget`.
///
/// Acquisition creates the marker with `create_new` so exactly one process
/// wins; losers back off linearly from `retry_delay` until the budget
/// elapses. A marker older than `stale_after` is treated as abandoned by a
/// crashed or stuck holder and reclaimed.
pub fn acquire(
    target: &Path,
    budget: Duration,
    stale_after: Duration,
    retry_delay: Duration,
) -> Result<LockGuard, LockError> {
    let marker = marker_path(target);
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(mut file) => {
                // Record the holder pid for operators inspecting the marker
                writeln!(file, "{}", std::process::id())?;
                file.flush()?;
                file.try_lock_exclusive()?;
                return Ok(LockGuard {
                    file: Some(file),
                    path: marker,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if reclaim_if_stale(&marker, stale_after)? {
                    continue;
                }
                if started.elapsed() >= budget {
                    return Err(LockError::Timeout {
                        path: target.display().to_string(),
                        waited_ms: budget.as_millis() as u64,
                    });
                }
                attempt += 1;
                thread::sleep(retry_delay * attempt.min(10));
            }
            Err(e) => return Err(LockError::IoError(e)),
        }
    }
}

/// Remove the marker if its holder has exceeded the stale threshold.
///
/// Returns true when the caller should re-contend immediately: either the
/// stale marker was removed (by us or a racing acquirer) or it disappeared
/// between attempts.
fn reclaim_if_stale(marker: &Path, stale_after: Duration) -> Result<bool, LockError> {
    match fs::metadata(marker) {
        Ok(meta) => {
            let modified = meta.modified()?;
            let age = SystemTime::now()
                .duration_since(modified)
                .unwrap_or_default();
            if age <= stale_after {
                return Ok(false);
            }
            warn!(
                "Reclaiming stale lock {} (held {}ms)",
                marker.display(),
                age.as_millis()
            );
            match fs::remove_file(marker) {
                Ok(_) => Ok(true),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
                Err(e) => Err(LockError::IoError(e)),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(LockError::IoError(e)),
    }
}
