//! External encoder discovery.
//!
//! Availability is sampled once per run by scanning `PATH`; a codec whose
//! tools go missing mid-run surfaces as an encode failure, not a detection
//! change.

use std::collections::BTreeSet;
use std::env;
use std::path::Path;

use tracing::debug;

use super::Codec;

/// Every external tool the engine can invoke.
pub const ALL_TOOLS: [&str; 5] = ["avifenc", "cjpeg", "cjxl", "ffmpeg", "heif-enc"];

/// Snapshot of which external encoder tools are on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ToolInventory {
    available: BTreeSet<String>,
}

impl ToolInventory {
    /// Scans `PATH` for all known tools.
    pub fn detect() -> Self {
        let available = ALL_TOOLS
            .iter()
            .filter(|tool| find_on_path(tool))
            .map(|tool| tool.to_string())
            .collect::<BTreeSet<_>>();
        debug!(?available, "detected encoder tools");
        ToolInventory { available }
    }

    /// Inventory with a fixed tool set, for tests and dry runs.
    pub fn with_tools<I, S>(tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolInventory {
            available: tools.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has(&self, tool: &str) -> bool {
        self.available.contains(tool)
    }

    /// Tools required by `codec` that are not available.
    pub fn missing_for(&self, codec: Codec) -> Vec<&'static str> {
        codec
            .required_tools()
            .iter()
            .copied()
            .filter(|tool| !self.has(tool))
            .collect()
    }

    /// Whether every tool `codec` needs is available.
    pub fn supports(&self, codec: Codec) -> bool {
        self.missing_for(codec).is_empty()
    }
}

fn find_on_path(tool: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| candidate_exists(&dir, tool))
}

fn candidate_exists(dir: &Path, tool: &str) -> bool {
    if is_executable(&dir.join(tool)) {
        return true;
    }
    cfg!(target_os = "windows") && is_executable(&dir.join(format!("{tool}.exe")))
}

// A plain file on PATH without the executable bit would pass an existence
// check but fail at spawn time, so detection requires execute permission.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inventory_supports_nothing() {
        let inventory = ToolInventory::default();
        for codec in Codec::ALL {
            assert!(!inventory.supports(codec));
        }
    }

    #[test]
    fn jpeg_needs_both_ffmpeg_and_cjpeg() {
        let only_ffmpeg = ToolInventory::with_tools(["ffmpeg"]);
        assert!(!only_ffmpeg.supports(Codec::Jpeg));
        assert_eq!(only_ffmpeg.missing_for(Codec::Jpeg), vec!["cjpeg"]);

        let both = ToolInventory::with_tools(["ffmpeg", "cjpeg"]);
        assert!(both.supports(Codec::Jpeg));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_files_are_not_detected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("cjxl");
        std::fs::write(&tool, b"#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!candidate_exists(dir.path(), "cjxl"));

        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(candidate_exists(dir.path(), "cjxl"));
    }

    #[test]
    fn single_tool_codecs_report_their_tool() {
        let inventory = ToolInventory::with_tools(["cjxl"]);
        assert!(inventory.supports(Codec::Jpegxl));
        assert_eq!(inventory.missing_for(Codec::Avif), vec!["avifenc"]);
        assert_eq!(inventory.missing_for(Codec::Heic), vec!["heif-enc"]);
    }
}
