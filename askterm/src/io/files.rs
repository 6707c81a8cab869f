//! All-or-nothing file writes for file actions.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Result of [`write_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Create all missing parent directories of `path`.
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Create `path` exclusively and write `contents`.
///
/// An existing file is left untouched and reported as
/// [`CreateOutcome::AlreadyExists`]. If the write fails after creation the
/// partial file is removed.
pub fn write_new(path: &Path, contents: &str) -> Result<CreateOutcome> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Ok(CreateOutcome::AlreadyExists);
        }
        Err(err) => return Err(err).with_context(|| format!("create {}", path.display())),
    };

    let written = file
        .write_all(contents.as_bytes())
        .and_then(|()| file.sync_all());
    if let Err(err) = written {
        drop(file);
        if let Err(remove_err) = fs::remove_file(path) {
            warn!(err = %remove_err, path = %path.display(), "failed to remove partial file");
        }
        return Err(err).with_context(|| format!("write {}", path.display()));
    }

    debug!(path = %path.display(), bytes = contents.len(), "created file");
    Ok(CreateOutcome::Created)
}

/// Replace the file at `path` atomically (temp file + rename).
///
/// Symlinks are followed, so the link target receives the new content, and
/// an existing file keeps its permissions.
pub fn overwrite(path: &Path, contents: &str) -> Result<()> {
    let target = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(err) if err.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(err) => return Err(err).with_context(|| format!("resolve {}", path.display())),
    };
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .with_context(|| format!("write temp file {}", tmp.path().display()))?;
    if let Ok(existing) = fs::metadata(&target) {
        fs::set_permissions(tmp.path(), existing.permissions())
            .with_context(|| format!("copy permissions of {}", target.display()))?;
    }
    tmp.persist(&target)
        .map_err(|err| err.error)
        .with_context(|| format!("replace {}", target.display()))?;

    debug!(path = %target.display(), bytes = contents.len(), "overwrote file");
    Ok(())
}
