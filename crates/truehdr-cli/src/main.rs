//! Headless front end for the truehdr engine.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use truehdr_core::codec::{Codec, ToolInventory};
use truehdr_core::job::{ConversionJob, JobEvent, JobRunner, Severity};
use truehdr_core::settings::{AppSettings, SETTINGS_FILE};

/// Sequence and convert paired SDR/HDR still renders.
#[derive(Debug, Parser)]
#[command(name = "truehdr", version, about)]
struct Cli {
    /// Directory containing the PNG (and optional EXR) source files.
    input_dir: PathBuf,

    /// Settings file to use instead of the per-user default.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Clear a non-empty output directory instead of refusing to run.
    #[arg(long)]
    force: bool,

    /// Filename prefix for renamed files.
    #[arg(long)]
    prefix: Option<String>,

    /// First sequence number.
    #[arg(long)]
    start: Option<u64>,

    /// Keep original filenames (disables renaming and EXR pairing).
    #[arg(long)]
    no_rename: bool,

    /// Skip encoding of SDR variants.
    #[arg(long)]
    no_sdr: bool,

    /// Skip encoding of HDR variants.
    #[arg(long)]
    no_hdr: bool,

    /// Disable a codec for this run (jpeg, jpegxl, heic, avif). Repeatable.
    #[arg(long, value_name = "CODEC", value_parser = parse_codec)]
    disable: Vec<Codec>,

    /// Override a codec's quality, e.g. --quality jpegxl=90. Repeatable.
    #[arg(long, value_name = "CODEC=QUALITY", value_parser = parse_quality)]
    quality: Vec<(Codec, u32)>,
}

fn parse_codec(s: &str) -> Result<Codec, String> {
    s.parse()
}

fn parse_quality(s: &str) -> Result<(Codec, u32), String> {
    let (codec, quality) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CODEC=QUALITY, got '{s}'"))?;
    let codec: Codec = codec.parse()?;
    let quality: u32 = quality
        .parse()
        .map_err(|_| format!("invalid quality '{quality}'"))?;
    Ok((codec, quality))
}

fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("truehdr").join(SETTINGS_FILE))
}

fn apply_overrides(settings: &mut AppSettings, cli: &Cli) {
    if let Some(prefix) = &cli.prefix {
        settings.prefix = prefix.clone();
    }
    if let Some(start) = cli.start {
        settings.start_counter = start;
    }
    if cli.no_rename {
        settings.rename_enabled = false;
    }
    if cli.no_sdr {
        settings.sdr_enabled = false;
    }
    if cli.no_hdr {
        settings.hdr_enabled = false;
    }
    for codec in &cli.disable {
        if let Some(entry) = settings.codecs.get_mut(codec) {
            entry.enabled = false;
        }
    }
    for (codec, quality) in &cli.quality {
        if let Some(entry) = settings.codecs.get_mut(codec) {
            entry.quality = *quality;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let settings_path = cli.settings.clone().or_else(default_settings_path);
    let mut settings = match &settings_path {
        Some(path) => AppSettings::load_or_default(path),
        None => AppSettings::default(),
    };
    apply_overrides(&mut settings, &cli);
    settings.normalize();

    settings.last_input_dir = Some(cli.input_dir.to_string_lossy().into_owned());
    if let Some(path) = &settings_path {
        if let Err(err) = settings.save(path) {
            warn!(path = %path.display(), error = %err, "failed to persist settings");
        }
    }

    let job = ConversionJob::new(cli.input_dir.clone(), settings, ToolInventory::detect());

    let output_dir = job.output_dir();
    if output_dir.is_dir() {
        let occupied = std::fs::read_dir(&output_dir)
            .with_context(|| format!("reading {}", output_dir.display()))?
            .next()
            .is_some();
        if occupied {
            if !cli.force {
                bail!(
                    "output directory {} is not empty (use --force to clear it)",
                    output_dir.display()
                );
            }
            std::fs::remove_dir_all(&output_dir)
                .with_context(|| format!("clearing {}", output_dir.display()))?;
        }
    }

    let mut events = JobRunner::new().start(job)?;
    let mut success = false;
    while let Some(event) = events.recv().await {
        match event {
            JobEvent::Progress { current, total } => {
                println!("[{current}/{total}]");
            }
            JobEvent::Status { message, severity } => {
                let tag = match severity {
                    Severity::Info => "info",
                    Severity::Warning => "warning",
                    Severity::Error => "error",
                    Severity::Success => "done",
                };
                println!("{tag}: {message}");
            }
            JobEvent::Finished { success: ok } => {
                success = ok;
            }
        }
    }

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
