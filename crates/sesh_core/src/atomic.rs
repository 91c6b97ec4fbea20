//! Backup-protected atomic file replacement.

use crate::error::Result;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Returns `<path>.bak`.
pub(crate) fn backup_path(path: &Path) -> PathBuf {
    sibling(path, "bak")
}

/// Returns `<path>.tmp`.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    sibling(path, "tmp")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Replaces `path` with `data` so readers never see a partial file.
///
/// The existing file is copied to `<path>.bak`, the new content goes to
/// `<path>.tmp`, the destination is removed and the temp file renamed over it.
/// The backup is dropped on success.
///
/// On failure the temp file is removed. The destination is restored from the
/// backup only if it had already been removed; an untouched destination is
/// never overwritten. The backup stays on disk only while it is the sole good
/// copy.
pub(crate) fn write_with_backup(path: &Path, data: &[u8]) -> Result<()> {
    let backup = backup_path(path);
    let tmp = temp_path(path);
    let mut destination_removed = false;

    match replace(path, &backup, &tmp, data, &mut destination_removed) {
        Ok(()) => {
            discard(&backup);
            Ok(())
        }
        Err(e) => {
            warn!("Failed to write {}: {}", path.display(), e);
            let intact = if destination_removed {
                restore(path, &backup)
            } else {
                path.exists()
            };
            if intact {
                discard(&backup);
            }
            discard(&tmp);
            Err(e)
        }
    }
}

fn replace(
    path: &Path,
    backup: &Path,
    tmp: &Path,
    data: &[u8],
    destination_removed: &mut bool,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if path.exists() {
        fs::copy(path, backup)?;
        #[cfg(test)]
        fail_point::hit(fail_point::FailPoint::Backup, backup)?;
    }

    {
        let mut file = File::create(tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    // Some filesystems refuse to rename over an existing file
    if path.exists() {
        fs::remove_file(path)?;
        *destination_removed = true;
    }
    #[cfg(test)]
    fail_point::hit(fail_point::FailPoint::Rename, tmp)?;
    fs::rename(tmp, path)?;

    #[cfg(unix)]
    {
        if let Some(parent) = path.parent() {
            if let Ok(dir_file) = File::open(parent) {
                let _ = dir_file.sync_all();
            }
        }
    }

    Ok(())
}

/// Copies the backup over a removed destination. Returns true on success.
fn restore(path: &Path, backup: &Path) -> bool {
    if !backup.exists() {
        warn!("No backup to restore {} from", path.display());
        return false;
    }

    match fs::copy(backup, path) {
        Ok(_) => {
            info!("Restored {} from backup", path.display());
            true
        }
        Err(e) => {
            warn!("Failed to restore {} from backup: {}", path.display(), e);
            false
        }
    }
}

fn discard(path: &Path) {
    if path.is_file() {
        if let Err(e) = fs::remove_file(path) {
            debug!("Could not remove {}: {}", path.display(), e);
        }
    }
}
