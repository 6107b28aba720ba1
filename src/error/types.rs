//! Error types
//!
//! Defines domain-specific error types for each module of the memory store.

use std::fmt;
use std::io;

/// Path resolver errors
#[derive(Debug)]
pub enum PathError {
    OutsideNamespace { path: String, prefix: String },
    PathTraversal(String),
    NotWithinRoot(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::OutsideNamespace { path, prefix } => {
                write!(f, "Invalid path: {} is outside the {} namespace", path, prefix)
            }
            PathError::PathTraversal(p) => write!(f, "Path traversal attempt: {}", p),
            PathError::NotWithinRoot(p) => write!(f, "Path not within storage root: {}", p),
        }
    }
}

impl std::error::Error for PathError {}

/// Concurrency coordinator errors
#[derive(Debug)]
pub enum LockError {
    Timeout { path: String, waited_ms: u64 },
    Conflict(String),
    IoError(io::Error),
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::Timeout { path, waited_ms } => {
                write!(f, "Timed out waiting for lock on {} after {}ms", path, waited_ms)
            }
            LockError::Conflict(p) => write!(
                f,
                "{} has been modified by another process. Re-read the file and retry",
                p
            ),
            LockError::IoError(e) => write!(f, "Lock IO error: {}", e),
        }
    }
}

impl std::error::Error for LockError {}

impl From<io::Error> for LockError {
    fn from(error: io::Error) -> Self {
        LockError::IoError(error)
    }
}

/// Operations engine errors
#[derive(Debug)]
pub enum StoreError {
    NotFound(String),
    NotAFile(String),
    NotUnique { path: String, count: usize },
    InvalidLine { line: i64, max: usize },
    InvalidRange(String),
    DestinationExists(String),
    RootDeletionForbidden(String),
    Path(PathError),
    Lock(LockError),
    IoError(io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(p) => write!(f, "Path not found: {}", p),
            StoreError::NotAFile(p) => write!(f, "Not a file: {}", p),
            StoreError::NotUnique { path, count: 0 } => {
                write!(f, "Text not found in {}", path)
            }
            StoreError::NotUnique { path, count } => write!(
                f,
                "Text appears {} times in {}. Must be unique for replacement",
                count, path
            ),
            StoreError::InvalidLine { line, max } => {
                write!(f, "Invalid insert_line {}. Must be between 0 and {}", line, max)
            }
            StoreError::InvalidRange(msg) => write!(f, "Invalid view_range: {}", msg),
            StoreError::DestinationExists(p) => write!(f, "Destination already exists: {}", p),
            StoreError::RootDeletionForbidden(p) => {
                write!(f, "Cannot delete the {} directory itself", p)
            }
            StoreError::Path(e) => write!(f, "{}", e),
            StoreError::Lock(e) => write!(f, "{}", e),
            StoreError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<PathError> for StoreError {
    fn from(error: PathError) -> Self {
        StoreError::Path(error)
    }
}

impl From<LockError> for StoreError {
    fn from(error: LockError) -> Self {
        StoreError::Lock(error)
    }
}

impl From<io::Error> for StoreError {
    fn from(error: io::Error) -> Self {
        StoreError::IoError(error)
    }
}

/// General server error that encompasses all error types
#[derive(Debug)]
pub enum ServerError {
    Path(PathError),
    Lock(LockError),
    Store(StoreError),
    IoError(io::Error),
    ConfigError(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Path(e) => write!(f, "Path error: {}", e),
            ServerError::Lock(e) => write!(f, "Lock error: {}", e),
            ServerError::Store(e) => write!(f, "Store error: {}", e),
            ServerError::IoError(e) => write!(f, "I/O error: {}", e),
            ServerError::ConfigError(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<PathError> for ServerError {
    fn from(error: PathError) -> Self {
        ServerError::Path(error)
    }
}

impl From<LockError> for ServerError {
    fn from(error: LockError) -> Self {
        ServerError::Lock(error)
    }
}

impl From<StoreError> for ServerError {
    fn from(error: StoreError) -> Self {
        ServerError::Store(error)
    }
}

impl From<io::Error> for ServerError {
    fn from(error: io::Error) -> Self {
        ServerError::IoError(error)
    }
}
