//! Path resolution and containment
//!
//! Maps virtual paths in the fixed namespace onto physical paths under the
//! namespace root, and back. Pure string/path manipulation; the only
//! filesystem knowledge is the canonicalized namespace root handed in by
//! the caller.

use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// Resolve a virtual path into a physical path under `namespace_root`.
///
/// The virtual path must begin with `prefix` followed by a path boundary;
/// a sibling name that merely starts with the same letters (`/memories-evil`)
/// is rejected. `.` and `..` segments are resolved lexically, repeated
/// separators collapse, and trailing separators are trimmed. Backslashes are
/// ordinary filename bytes, not separators. The caller is expected to have
/// decoded any percent-encoding before this point; no decoding happens here.
///
/// Containment is verified component-wise against `namespace_root` on every
/// call. The check is lexical: symbolic links under the root are not
/// re-resolved through the live filesystem.
pub fn resolve_virtual_path(
    namespace_root: &Path,
    prefix: &str,
    virtual_path: &str,
) -> Result<PathBuf, PathError> {
    let remainder = strip_namespace_prefix(prefix, virtual_path).ok_or_else(|| {
        PathError::OutsideNamespace {
            path: virtual_path.to_string(),
            prefix: prefix.to_string(),
        }
    })?;

    let mut physical = namespace_root.to_path_buf();
    for segment in remainder.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                // Popping past the namespace root escapes it
                if physical == namespace_root || !physical.pop() {
                    return Err(PathError::PathTraversal(virtual_path.to_string()));
                }
            }
            name => physical.push(name),
        }
    }

    // Checked on every call even though the walk above cannot escape;
    // starts_with compares whole components, not string prefixes.
    if !physical.starts_with(namespace_root) {
        return Err(PathError::PathTraversal(virtual_path.to_string()));
    }

    Ok(physical)
}

/// Map a physical path back to its virtual form.
///
/// Used for human-readable messages only, never for security decisions.
pub fn to_virtual_path(
    namespace_root: &Path,
    prefix: &str,
    physical: &Path,
) -> Result<String, PathError> {
    let relative = physical
        .strip_prefix(namespace_root)
        .map_err(|_| PathError::NotWithinRoot(physical.display().to_string()))?;

    let mut virtual_path = prefix.to_string();
    for component in relative.components() {
        if let Component::Normal(name) = component {
            virtual_path.push('/');
            virtual_path.push_str(&name.to_string_lossy());
        }
    }
    Ok(virtual_path)
}

/// Strip the namespace prefix, requiring a path boundary after it.
fn strip_namespace_prefix<'a>(prefix: &str, virtual_path: &'a str) -> Option<&'a str> {
    let rest = virtual_path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
