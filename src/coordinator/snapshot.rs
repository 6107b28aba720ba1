//! Optimistic conflict detection snapshots

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::LockError;

/// Last-modified timestamp of a lock target at a point in time.
///
/// `None` means the target did not exist. Captured immediately before lock
/// acquisition and compared again once the lock is held; any difference,
/// including absent-to-present and present-to-absent transitions, is a
/// conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot(Option<SystemTime>);

impl Snapshot {
    pub fn capture(target: &Path) -> Result<Self, LockError> {
        match fs::metadata(target) {
            Ok(meta) => Ok(Snapshot(Some(meta.modified()?))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot(None)),
            Err(e) => Err(LockError::IoError(e)),
        }
    }
}
