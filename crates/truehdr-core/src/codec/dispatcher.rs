//! Per-file encode fan-out.
//!
//! Encoders write to a shared temp basename in the output directory and the
//! result is renamed into place only after the tool exits successfully, so a
//! crashed encoder never leaves a half-written file under a final name.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use super::tables;
use super::{Codec, DynamicRange, EncodeError, EncodeSpec, ToolInventory};
use crate::process::configure_command;

/// Basename shared by all intermediate encoder outputs.
pub const TEMP_BASENAME: &str = "Tempfile";

const TEMP_EXTENSIONS: [&str; 5] = ["bmp", "jpg", "jxl", "heic", "avif"];

/// Runs the enabled, tool-satisfied codecs against one PNG at a time.
#[derive(Debug)]
pub struct CodecDispatcher {
    specs: Vec<EncodeSpec>,
    tools: ToolInventory,
}

impl CodecDispatcher {
    pub fn new(specs: Vec<EncodeSpec>, tools: ToolInventory) -> Self {
        CodecDispatcher { specs, tools }
    }

    /// Enabled codecs whose tools are missing, with the tools they lack.
    pub fn unsatisfiable(&self) -> Vec<(Codec, Vec<&'static str>)> {
        self.specs
            .iter()
            .filter(|spec| spec.enabled && !self.tools.supports(spec.codec))
            .map(|spec| (spec.codec, self.tools.missing_for(spec.codec)))
            .collect()
    }

    /// Specs that will actually run: enabled and fully tool-satisfied.
    fn effective_specs(&self) -> impl Iterator<Item = &EncodeSpec> {
        self.specs
            .iter()
            .filter(|spec| spec.enabled && self.tools.supports(spec.codec))
    }

    fn should_run(&self, codec: Codec, range: DynamicRange) -> Option<u32> {
        if !codec.supports(range) {
            return None;
        }
        self.effective_specs()
            .find(|spec| spec.codec == codec)
            .map(|spec| spec.quality)
    }

    /// Encodes one finalized PNG into every runnable codec output. The
    /// outputs land next to the source, named after its stem.
    pub async fn encode(&self, file: &Path, range: DynamicRange) -> Result<(), EncodeError> {
        let dir = file.parent().unwrap_or_else(|| Path::new("."));
        self.remove_stale_temps(dir).await?;

        if let Some(quality) = self.should_run(Codec::Jpeg, range) {
            let bmp = temp_path(dir, "bmp");
            let jpg = temp_path(dir, "jpg");
            self.run_tool("ffmpeg", &tables::ffmpeg_bmp_args(file, &bmp))
                .await?;
            self.run_tool("cjpeg", &tables::cjpeg_args(&bmp, &jpg, quality))
                .await?;
            remove_if_exists(&bmp).await?;
            finalize(&jpg, file, Codec::Jpeg).await?;
        }

        if let Some(quality) = self.should_run(Codec::Jpegxl, range) {
            let jxl = temp_path(dir, "jxl");
            self.run_tool("cjxl", &tables::cjxl_args(file, &jxl, quality, range))
                .await?;
            finalize(&jxl, file, Codec::Jpegxl).await?;
        }

        if let Some(quality) = self.should_run(Codec::Heic, range) {
            let heic = temp_path(dir, "heic");
            self.run_tool("heif-enc", &tables::heif_enc_args(file, &heic, quality, range))
                .await?;
            finalize(&heic, file, Codec::Heic).await?;
        }

        if let Some(quality) = self.should_run(Codec::Avif, range) {
            let avif = temp_path(dir, "avif");
            self.run_tool("avifenc", &tables::avifenc_args(file, &avif, quality, range))
                .await?;
            finalize(&avif, file, Codec::Avif).await?;
        }

        Ok(())
    }

    /// Clears leftovers from an interrupted earlier run so a stale temp can
    /// never be finalized as this file's output.
    async fn remove_stale_temps(&self, dir: &Path) -> Result<(), EncodeError> {
        remove_if_exists(&dir.join(TEMP_BASENAME)).await?;
        for ext in TEMP_EXTENSIONS {
            remove_if_exists(&temp_path(dir, ext)).await?;
        }
        Ok(())
    }

    async fn run_tool(&self, tool: &'static str, args: &[String]) -> Result<(), EncodeError> {
        info!(tool, ?args, "running encoder");
        let mut cmd = Command::new(tool);
        cmd.args(args);
        configure_command(&mut cmd);

        let output = cmd
            .output()
            .await
            .map_err(|source| EncodeError::Spawn { tool, source })?;
        if !output.status.success() {
            return Err(EncodeError::ToolFailed {
                tool,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        debug!(tool, "encoder finished");
        Ok(())
    }
}

fn temp_path(dir: &Path, ext: &str) -> PathBuf {
    dir.join(format!("{TEMP_BASENAME}.{ext}"))
}

/// Moves a finished temp output to its final name next to `source`.
async fn finalize(temp: &Path, source: &Path, codec: Codec) -> Result<(), EncodeError> {
    let target = source.with_extension(codec.extension());
    tokio::fs::rename(temp, &target).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<(), EncodeError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(codec: Codec, enabled: bool, quality: u32) -> EncodeSpec {
        EncodeSpec {
            codec,
            enabled,
            quality,
        }
    }

    fn all_tools() -> ToolInventory {
        ToolInventory::with_tools(super::super::detection::ALL_TOOLS)
    }

    #[test]
    fn disabled_codecs_never_run() {
        let dispatcher = CodecDispatcher::new(vec![spec(Codec::Avif, false, 99)], all_tools());
        assert_eq!(dispatcher.should_run(Codec::Avif, DynamicRange::Sdr), None);
        assert!(dispatcher.unsatisfiable().is_empty());
    }

    #[test]
    fn jpeg_is_skipped_for_hdr_input() {
        let dispatcher = CodecDispatcher::new(vec![spec(Codec::Jpeg, true, 95)], all_tools());
        assert_eq!(
            dispatcher.should_run(Codec::Jpeg, DynamicRange::Sdr),
            Some(95)
        );
        assert_eq!(dispatcher.should_run(Codec::Jpeg, DynamicRange::Hdr), None);
    }

    #[test]
    fn missing_tools_make_a_codec_unsatisfiable() {
        let dispatcher = CodecDispatcher::new(
            vec![spec(Codec::Jpeg, true, 95), spec(Codec::Jpegxl, true, 99)],
            ToolInventory::with_tools(["cjxl"]),
        );

        assert_eq!(dispatcher.should_run(Codec::Jpeg, DynamicRange::Sdr), None);
        assert_eq!(
            dispatcher.should_run(Codec::Jpegxl, DynamicRange::Sdr),
            Some(99)
        );
        assert_eq!(
            dispatcher.unsatisfiable(),
            vec![(Codec::Jpeg, vec!["ffmpeg", "cjpeg"])]
        );
    }

    #[tokio::test]
    async fn encode_with_no_runnable_codecs_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("Image_1.png");
        std::fs::write(&png, b"png").unwrap();

        let dispatcher =
            CodecDispatcher::new(vec![spec(Codec::Avif, true, 99)], ToolInventory::default());
        dispatcher.encode(&png, DynamicRange::Sdr).await.unwrap();

        assert!(png.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn stale_temps_are_cleared_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("Image_1.png");
        std::fs::write(&png, b"png").unwrap();
        let stale = dir.path().join("Tempfile.bmp");
        std::fs::write(&stale, b"stale").unwrap();

        let dispatcher = CodecDispatcher::new(vec![], ToolInventory::default());
        dispatcher.encode(&png, DynamicRange::Sdr).await.unwrap();

        assert!(!stale.exists());
    }
}
