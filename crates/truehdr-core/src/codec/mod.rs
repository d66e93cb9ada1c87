//! Output codecs and encoder orchestration.
//!
//! Each codec maps to a fixed external-tool invocation with a frozen
//! parameter set; only the quality value and the SDR/HDR color variant differ
//! between runs. Detection scans `PATH` once per run, and the dispatcher
//! drives the per-file encode fan-out.

use std::fmt;
use std::process::ExitStatus;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod dispatcher;
mod tables;

pub mod detection;

pub use detection::ToolInventory;
pub use dispatcher::CodecDispatcher;

/// Dynamic range of a PNG variant being encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicRange {
    Sdr,
    Hdr,
}

/// Supported output codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Jpeg,
    Jpegxl,
    Heic,
    Avif,
}

impl Codec {
    pub const ALL: [Codec; 4] = [Codec::Jpeg, Codec::Jpegxl, Codec::Heic, Codec::Avif];

    pub fn name(self) -> &'static str {
        match self {
            Codec::Jpeg => "jpeg",
            Codec::Jpegxl => "jpegxl",
            Codec::Heic => "heic",
            Codec::Avif => "avif",
        }
    }

    /// Extension of the finalized output file.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Jpeg => "jpg",
            Codec::Jpegxl => "jxl",
            Codec::Heic => "heic",
            Codec::Avif => "avif",
        }
    }

    /// External tools that must all be on `PATH` for this codec to run.
    pub fn required_tools(self) -> &'static [&'static str] {
        match self {
            Codec::Jpeg => &["ffmpeg", "cjpeg"],
            Codec::Jpegxl => &["cjxl"],
            Codec::Heic => &["heif-enc"],
            Codec::Avif => &["avifenc"],
        }
    }

    /// Whether this codec encodes the given dynamic range. JPEG cannot carry
    /// HDR metadata and is SDR-only.
    pub fn supports(self, range: DynamicRange) -> bool {
        match (self, range) {
            (Codec::Jpeg, DynamicRange::Hdr) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Codec::Jpeg),
            "jpegxl" | "jxl" => Ok(Codec::Jpegxl),
            "heic" => Ok(Codec::Heic),
            "avif" => Ok(Codec::Avif),
            other => Err(format!(
                "unknown codec '{other}' (expected jpeg, jpegxl, heic, or avif)"
            )),
        }
    }
}

/// One codec's per-run encode configuration.
#[derive(Debug, Clone, Copy)]
pub struct EncodeSpec {
    pub codec: Codec,
    pub enabled: bool,
    pub quality: u32,
}

/// Errors from external encoder invocations.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
