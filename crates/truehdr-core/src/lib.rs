//! Core engine for sequencing and converting paired SDR/HDR still renders.
//!
//! Given a directory of PNG renders (SDR plus optional `_HDR` variants and
//! EXR siblings), the engine copies them into an `output/` subdirectory,
//! renames them into a prefixed, numbered scheme, and hands each PNG to the
//! enabled external encoders (JPEG, JPEG XL, HEIC, AVIF). Jobs report
//! progress and status over a channel; see [`job::JobRunner`].

pub mod codec;
mod error;
pub mod grouping;
pub mod job;
pub mod naming;
pub mod process;
pub mod rename;
pub mod sequencing;
pub mod settings;

pub use error::{ConvertError, ConvertResult};
