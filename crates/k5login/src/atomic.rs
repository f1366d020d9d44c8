//! Atomic file replacement.
//!
//! Content is written to a temp file in the target's directory, synced, and
//! renamed over the target. Until the rename succeeds the original file is
//! untouched, and a failed write leaves no temp file behind.

use crate::error::{Error, Result};
use crate::mode::Mode;
use std::fs::{self, File, Metadata, Permissions};
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

/// Replace `path` with whatever `write` produces.
///
/// A new file gets `default_mode`. An existing file keeps its permission
/// bits and, where the process is allowed to, its owner and group.
pub fn replace_file<F>(path: &Path, default_mode: Mode, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => return Err(Error::InvalidPath(path.to_path_buf())),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))?;

    let existing = match fs::metadata(path) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(path, e)),
    };

    let prefix = format!(".{}.", file_name.to_string_lossy());
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;

    // chown clears setuid/setgid, so ownership goes first
    if let Some(meta) = &existing {
        preserve_owner(temp.as_file(), meta).map_err(|e| Error::io(temp.path(), e))?;
    }

    let mode = existing
        .as_ref()
        .map(|meta| Mode::from_raw(meta.mode()))
        .unwrap_or(default_mode);
    temp.as_file()
        .set_permissions(Permissions::from_mode(mode.bits()))
        .map_err(|e| Error::io(temp.path(), e))?;

    write(temp.as_file_mut()).map_err(|e| Error::io(temp.path(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::io(temp.path(), e))?;

    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Hand the temp file to the existing file's owner.
///
/// Unprivileged callers cannot give files away; that refusal is not an error
/// since the replacement then simply belongs to the caller.
fn preserve_owner(file: &File, existing: &Metadata) -> io::Result<()> {
    let current = file.metadata()?;
    if current.uid() == existing.uid() && current.gid() == existing.gid() {
        return Ok(());
    }
    match std::os::unix::fs::fchown(file, Some(existing.uid()), Some(existing.gid())) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Ok(()),
        other => other,
    }
}
