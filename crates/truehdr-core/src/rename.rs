//! In-place renaming with collision skipping and an audit log.
//!
//! Renames never overwrite: if the target name is already taken the source is
//! left untouched and the skip is reported to the caller. Every successful
//! rename is appended to `rename.log` so a run can be audited afterwards.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Append-only audit log of performed renames, one `old -> new` line each.
#[derive(Debug)]
pub struct RenameLog {
    file: File,
}

impl RenameLog {
    /// Creates (truncating) the log file at `path`.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(RenameLog { file })
    }

    /// Records one rename. Logging failures must not abort a run that has
    /// already moved files, so they only produce a warning.
    pub fn record(&mut self, old: &Path, new: &Path) {
        let line = format!("{} -> {}\n", file_name(old), file_name(new));
        if let Err(err) = self.file.write_all(line.as_bytes()) {
            warn!(error = %err, "failed to append to rename log");
        }
    }
}

/// Result of one rename attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed(PathBuf),
    /// Target name already taken; the source was left untouched.
    SkippedCollision { target: PathBuf },
}

/// Renames `path` to `new_stem` (same directory, same extension). Existing
/// targets win: the rename is skipped rather than overwriting.
pub fn rename_to_stem(
    path: &Path,
    new_stem: &str,
    log: &mut RenameLog,
) -> std::io::Result<RenameOutcome> {
    let target = sibling_with_stem(path, new_stem);
    if target.exists() {
        warn!(target = %target.display(), "target name taken, skipping rename");
        return Ok(RenameOutcome::SkippedCollision { target });
    }
    std::fs::rename(path, &target)?;
    log.record(path, &target);
    Ok(RenameOutcome::Renamed(target))
}

/// Result of renaming an EXR sibling alongside its HDR PNG.
#[derive(Debug, PartialEq, Eq)]
pub enum ExrRenameOutcome {
    Renamed(PathBuf),
    SkippedCollision { target: PathBuf },
    /// No EXR file exists at the expected source path.
    SourceMissing,
}

/// Renames the EXR sibling of an HDR variant to match `new_stem`. A missing
/// source is reported, not treated as an error, since HDR PNGs without an EXR
/// counterpart are legal input.
pub fn rename_exr_sibling(
    src: &Path,
    new_stem: &str,
    log: &mut RenameLog,
) -> std::io::Result<ExrRenameOutcome> {
    if !src.exists() {
        return Ok(ExrRenameOutcome::SourceMissing);
    }
    match rename_to_stem(src, new_stem, log)? {
        RenameOutcome::Renamed(target) => Ok(ExrRenameOutcome::Renamed(target)),
        RenameOutcome::SkippedCollision { target } => {
            Ok(ExrRenameOutcome::SkippedCollision { target })
        }
    }
}

fn sibling_with_stem(path: &Path, new_stem: &str) -> PathBuf {
    let file_name = match path.extension() {
        Some(ext) => format!("{}.{}", new_stem, ext.to_string_lossy()),
        None => new_stem.to_string(),
    };
    path.with_file_name(file_name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
