//! Operation context
//!
//! Shared, immutable state handed to every operation: the storage root,
//! the namespace it serves, lock budgets, and the diagnostics handle.
//! Carries no per-call mutable state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::coordinator::LockSettings;
use crate::diagnostics::DiagnosticsHandle;

pub struct StoreContext {
    storage_root: PathBuf,
    namespace_root: PathBuf,
    prefix: String,
    locks: LockSettings,
    diagnostics: DiagnosticsHandle,
}

impl StoreContext {
    /// Create the context, making the storage and namespace directories as
    /// needed and fixing the canonical namespace root for the process
    /// lifetime.
    pub fn new(
        storage_root: &Path,
        namespace: &str,
        locks: LockSettings,
        diagnostics: DiagnosticsHandle,
    ) -> io::Result<Self> {
        fs::create_dir_all(storage_root.join(namespace))?;
        let storage_root = storage_root.canonicalize()?;
        let namespace_root = storage_root.join(namespace).canonicalize()?;

        Ok(Self {
            storage_root,
            namespace_root,
            prefix: format!("/{}", namespace),
            locks,
            diagnostics,
        })
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn namespace_root(&self) -> &Path {
        &self.namespace_root
    }

    /// Virtual namespace prefix, e.g. `/memories`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn locks(&self) -> &LockSettings {
        &self.locks
    }

    pub fn diagnostics(&self) -> &DiagnosticsHandle {
        &self.diagnostics
    }
}
