//! Store operations
//!
//! Implements the six commands over the namespaced file store. Every
//! operation resolves its virtual path(s) first, then runs its filesystem
//! body under the concurrency coordinator.

use log::info;
use std::fs;
use std::path::Path;

use crate::coordinator::{Mode, with_coordination, with_coordination_pair};
use crate::error::StoreError;
use crate::paths::resolve_virtual_path;
use crate::store::context::StoreContext;

/// View a directory listing or a file's content with 1-based line numbers.
///
/// `view_range` slices file output to `[start_line, end_line]`, where an
/// `end_line` of -1 means through end of file. Ranges are rejected, not
/// clamped, when they fall outside the file.
pub fn view(
    ctx: &StoreContext,
    path: &str,
    view_range: Option<(i64, i64)>,
) -> Result<String, StoreError> {
    let physical = resolve_virtual_path(ctx.namespace_root(), ctx.prefix(), path)?;

    with_coordination(ctx.locks(), &physical, path, Mode::Read, || {
        if physical.is_dir() {
            list_directory(&physical, path)
        } else if physical.is_file() {
            read_numbered(&physical, view_range)
        } else {
            Err(StoreError::NotFound(path.to_string()))
        }
    })
}

/// Create or overwrite a file, making parent directories as needed.
///
/// Content is written exactly as given, including empty content.
pub fn create(ctx: &StoreContext, path: &str, file_text: &str) -> Result<String, StoreError> {
    let physical = resolve_virtual_path(ctx.namespace_root(), ctx.prefix(), path)?;

    with_coordination(ctx.locks(), &physical, path, Mode::Write, || {
        if physical.is_dir() {
            return Err(StoreError::NotAFile(path.to_string()));
        }
        if let Some(parent) = physical.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&physical, file_text)?;

        info!("Created file {} (real: {})", path, physical.display());
        Ok(format!("File created successfully at {}", path))
    })
}

/// Replace a substring that occurs exactly once in the file.
pub fn str_replace(
    ctx: &StoreContext,
    path: &str,
    old_str: &str,
    new_str: &str,
) -> Result<String, StoreError> {
    let physical = resolve_virtual_path(ctx.namespace_root(), ctx.prefix(), path)?;

    with_coordination(ctx.locks(), &physical, path, Mode::Write, || {
        if physical.is_dir() {
            return Err(StoreError::NotAFile(path.to_string()));
        }
        if !physical.is_file() {
            return Err(StoreError::NotFound(path.to_string()));
        }

        let content = fs::read_to_string(&physical)?;
        let count = content.matches(old_str).count();
        if count != 1 {
            return Err(StoreError::NotUnique {
                path: path.to_string(),
                count,
            });
        }

        fs::write(&physical, content.replacen(old_str, new_str, 1))?;

        info!("Edited file {} (real: {})", path, physical.display());
        Ok(format!("File {} has been edited", path))
    })
}

/// Insert `insert_text` as a new line at 0-based position `insert_line`.
///
/// Valid positions are `[0, line_count]` inclusive: 0 prepends,
/// `line_count` appends.
pub fn insert(
    ctx: &StoreContext,
    path: &str,
    insert_line: i64,
    insert_text: &str,
) -> Result<String, StoreError> {
    let physical = resolve_virtual_path(ctx.namespace_root(), ctx.prefix(), path)?;

    with_coordination(ctx.locks(), &physical, path, Mode::Write, || {
        if physical.is_dir() {
            return Err(StoreError::NotAFile(path.to_string()));
        }
        if !physical.is_file() {
            return Err(StoreError::NotFound(path.to_string()));
        }

        let content = fs::read_to_string(&physical)?;
        let mut lines: Vec<&str> = content.split('\n').collect();
        let max = lines.len();
        if insert_line < 0 || insert_line as usize > max {
            return Err(StoreError::InvalidLine {
                line: insert_line,
                max,
            });
        }

        lines.insert(insert_line as usize, insert_text);
        fs::write(&physical, lines.join("\n"))?;

        info!(
            "Inserted text at line {} in {} (real: {})",
            insert_line,
            path,
            physical.display()
        );
        Ok(format!("Text inserted at line {} in {}", insert_line, path))
    })
}

/// Delete a file, or a directory and all its contents.
///
/// The namespace root itself is never deletable, regardless of emptiness.
pub fn delete(ctx: &StoreContext, path: &str) -> Result<String, StoreError> {
    let physical = resolve_virtual_path(ctx.namespace_root(), ctx.prefix(), path)?;

    if physical == ctx.namespace_root() {
        return Err(StoreError::RootDeletionForbidden(ctx.prefix().to_string()));
    }

    with_coordination(ctx.locks(), &physical, path, Mode::Write, || {
        if physical.is_file() {
            fs::remove_file(&physical)?;
            info!("Deleted file {} (real: {})", path, physical.display());
            Ok(format!("File deleted: {}", path))
        } else if physical.is_dir() {
            fs::remove_dir_all(&physical)?;
            info!("Deleted directory {} (real: {})", path, physical.display());
            Ok(format!("Directory deleted: {}", path))
        } else {
            Err(StoreError::NotFound(path.to_string()))
        }
    })
}

/// Move a file or directory to a new virtual path.
///
/// Destination parents are created as needed; an existing destination is
/// refused, never silently overwritten. Both the source and destination
/// lock targets are held for the duration.
pub fn rename(ctx: &StoreContext, old_path: &str, new_path: &str) -> Result<String, StoreError> {
    let source = resolve_virtual_path(ctx.namespace_root(), ctx.prefix(), old_path)?;
    let dest = resolve_virtual_path(ctx.namespace_root(), ctx.prefix(), new_path)?;

    with_coordination_pair(ctx.locks(), &source, old_path, &dest, || {
        if !source.exists() {
            return Err(StoreError::NotFound(old_path.to_string()));
        }
        if dest.exists() {
            return Err(StoreError::DestinationExists(new_path.to_string()));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&source, &dest)?;

        info!(
            "Renamed {} to {} (real: {} -> {})",
            old_path,
            new_path,
            source.display(),
            dest.display()
        );
        Ok(format!("Renamed {} to {}", old_path, new_path))
    })
}

/// Immediate children of a directory, one per line, directories suffixed
/// with a separator, dot-prefixed names excluded. Sorted for stable output.
fn list_directory(physical: &Path, virtual_path: &str) -> Result<String, StoreError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(physical)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_dir() {
            entries.push(format!("{}/", name));
        } else {
            entries.push(name);
        }
    }
    entries.sort();

    let mut output = format!("Directory: {}\n", virtual_path);
    for entry in &entries {
        output.push_str(entry);
        output.push('\n');
    }
    Ok(output)
}

/// File content with 1-based line numbers, optionally sliced to a range.
fn read_numbered(physical: &Path, view_range: Option<(i64, i64)>) -> Result<String, StoreError> {
    let content = fs::read_to_string(physical)?;
    let lines: Vec<&str> = content.split('\n').collect();

    let (start, end) = match view_range {
        None => (1, lines.len()),
        Some((start_line, end_line)) => {
            if start_line < 1 || start_line as usize > lines.len() {
                return Err(StoreError::InvalidRange(format!(
                    "start_line {} out of bounds (1-{})",
                    start_line,
                    lines.len()
                )));
            }
            let end = if end_line == -1 {
                lines.len()
            } else if end_line < start_line {
                return Err(StoreError::InvalidRange(format!(
                    "end_line {} precedes start_line {}",
                    end_line, start_line
                )));
            } else {
                (end_line as usize).min(lines.len())
            };
            (start_line as usize, end)
        }
    };

    let numbered: Vec<String> = lines[start - 1..end]
        .iter()
        .enumerate()
        .map(|(offset, line)| format!("{}: {}", start + offset, line))
        .collect();
    Ok(numbered.join("\n"))
}
