//! Conversion job orchestration.
//!
//! A job copies source files into `output/`, renames them into the sequenced
//! scheme, and fans each PNG out to the enabled encoders. Progress and status
//! flow to the caller over an unbounded channel; at most one job runs per
//! [`JobRunner`] at a time.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::codec::{CodecDispatcher, DynamicRange, ToolInventory};
use crate::error::{ConvertError, ConvertResult};
use crate::grouping::GroupIndex;
use crate::rename::{self, ExrRenameOutcome, RenameLog, RenameOutcome};
use crate::sequencing::{self, SequencePlan};
use crate::settings::AppSettings;

mod runlog;

pub use runlog::RunLog;

/// Activity log filename inside the output directory.
pub const RUN_LOG_FILE: &str = "logging.log";
/// Rename audit log filename inside the output directory.
pub const RENAME_LOG_FILE: &str = "rename.log";
/// Subdirectory of the input directory that receives all outputs.
pub const OUTPUT_DIR_NAME: &str = "output";

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

/// Events emitted while a job runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum JobEvent {
    /// One more PNG handled out of the run's total.
    #[serde(rename_all = "camelCase")]
    Progress { current: usize, total: usize },
    #[serde(rename_all = "camelCase")]
    Status { message: String, severity: Severity },
    #[serde(rename_all = "camelCase")]
    Finished { success: bool },
}

enum Outcome {
    Completed,
    /// Nothing to process; the run is a successful no-op.
    NoSourceFiles,
}

/// One configured conversion over one input directory.
#[derive(Debug)]
pub struct ConversionJob {
    input_dir: PathBuf,
    settings: AppSettings,
    tools: ToolInventory,
}

impl ConversionJob {
    pub fn new(input_dir: PathBuf, settings: AppSettings, tools: ToolInventory) -> Self {
        ConversionJob {
            input_dir,
            settings,
            tools,
        }
    }

    /// Directory all outputs are written into.
    pub fn output_dir(&self) -> PathBuf {
        self.input_dir.join(OUTPUT_DIR_NAME)
    }

    async fn run(&self, events: &UnboundedSender<JobEvent>) -> ConvertResult<Outcome> {
        if !self.input_dir.is_dir() {
            return Err(ConvertError::InputDirNotFound(self.input_dir.clone()));
        }

        let output_dir = self.output_dir();
        tokio::fs::create_dir_all(&output_dir).await?;

        let run_log = RunLog::create(&output_dir.join(RUN_LOG_FILE))?;
        let mut rename_log = RenameLog::create(&output_dir.join(RENAME_LOG_FILE))?;

        let (png_files, exr_files) = self.copy_source_files(&output_dir, &run_log).await?;
        if png_files.is_empty() {
            run_log.warn("No PNG files found");
            send_status(events, "No PNG files found", Severity::Warning);
            return Ok(Outcome::NoSourceFiles);
        }

        let index = GroupIndex::build(&png_files, &exr_files);
        if index.sdr_identity_count() == 0 {
            run_log.warn("No SDR PNG files found");
            send_status(events, "No SDR PNG files found", Severity::Warning);
            return Ok(Outcome::NoSourceFiles);
        }

        let settings = &self.settings;
        let policy = settings.numbering_policy();
        // Widths are frozen before any file is touched. Without renaming (or
        // without a counter) no numbers are rendered and width is moot.
        let sequence_digits = if settings.rename_enabled && settings.counter_enabled {
            sequencing::sequence_digits(
                settings.start_counter,
                index.sdr_identity_count(),
                policy.mode,
                policy.manual_digits,
            )
        } else {
            1
        };
        let duplicate_digits = sequencing::duplicate_digits(index.max_duplicate_index());

        let identities = index.identities_in_order();
        let plan = SequencePlan::new(
            &identities,
            settings.start_counter,
            sequence_digits,
            duplicate_digits,
            policy.zero_fill_enabled,
        );

        let dispatcher = CodecDispatcher::new(settings.encode_specs(), self.tools.clone());
        let unsatisfiable = dispatcher.unsatisfiable();
        if !unsatisfiable.is_empty() {
            let mut missing: Vec<&str> = unsatisfiable
                .iter()
                .flat_map(|(_, tools)| tools.iter().copied())
                .collect();
            missing.sort_unstable();
            missing.dedup();
            let message = format!("Missing tools: {}", missing.join(", "));
            run_log.warn(&message);
            send_status(events, &message, Severity::Warning);
        }

        let total = index.total_png_files();
        let mut processed = 0usize;

        for identity in &identities {
            let Some(group) = index.get(identity) else {
                continue;
            };
            let base_stem = self.base_stem(&plan, identity);

            for (dup_index, path) in group.sdr.iter().enumerate() {
                let stem = format!("{}{}", base_stem, plan.duplicate_suffix(dup_index));
                let (file, skipped) = self.apply_rename(path, &stem, &mut rename_log, &run_log)?;
                if !skipped && settings.sdr_enabled {
                    self.encode(&dispatcher, &file, DynamicRange::Sdr, &run_log)
                        .await?;
                }
                processed += 1;
                send_progress(events, processed, total);
            }

            for (dup_index, path) in group.hdr.iter().enumerate() {
                let stem = format!(
                    "{}{}{}",
                    base_stem,
                    crate::naming::HDR_MARKER,
                    plan.duplicate_suffix(dup_index)
                );
                let (file, skipped) = self.apply_rename(path, &stem, &mut rename_log, &run_log)?;
                if settings.rename_enabled && !skipped {
                    self.pair_exr(group.exr.get(dup_index), path, &stem, &mut rename_log, &run_log)?;
                }
                if !skipped && settings.hdr_enabled {
                    self.encode(&dispatcher, &file, DynamicRange::Hdr, &run_log)
                        .await?;
                }
                processed += 1;
                send_progress(events, processed, total);
            }
        }

        run_log.info("Processing completed");
        Ok(Outcome::Completed)
    }

    /// Copies top-level PNG and EXR files into the output directory, returning
    /// their new paths in case-insensitive name order.
    async fn copy_source_files(
        &self,
        output_dir: &Path,
        run_log: &RunLog,
    ) -> ConvertResult<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut png_files = Vec::new();
        let mut exr_files = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.input_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let bucket = match ext.as_str() {
                "png" => &mut png_files,
                "exr" => &mut exr_files,
                _ => {
                    debug!(path = %path.display(), "ignoring non-PNG/EXR entry");
                    continue;
                }
            };
            let Some(name) = path.file_name() else {
                continue;
            };
            let copied = output_dir.join(name);
            tokio::fs::copy(&path, &copied).await?;
            bucket.push(copied);
        }

        for bucket in [&mut png_files, &mut exr_files] {
            bucket.sort_by_key(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default()
            });
        }

        run_log.info(&format!(
            "Copied {} PNG and {} EXR files into {}",
            png_files.len(),
            exr_files.len(),
            output_dir.display()
        ));
        Ok((png_files, exr_files))
    }

    // The counter toggle only affects digit width (disabled means width 1);
    // the number itself is always part of the renamed stem.
    fn base_stem(&self, plan: &SequencePlan, identity: &str) -> String {
        match plan.render_number(identity) {
            Some(number) => format!("{}{}", self.settings.prefix, number),
            None => self.settings.prefix.clone(),
        }
    }

    /// Renames one PNG when renaming is enabled. Returns the path the file
    /// now lives at and whether it was skipped on a collision.
    fn apply_rename(
        &self,
        path: &Path,
        stem: &str,
        rename_log: &mut RenameLog,
        run_log: &RunLog,
    ) -> ConvertResult<(PathBuf, bool)> {
        if !self.settings.rename_enabled {
            return Ok((path.to_path_buf(), false));
        }
        match rename::rename_to_stem(path, stem, rename_log)? {
            RenameOutcome::Renamed(new_path) => Ok((new_path, false)),
            RenameOutcome::SkippedCollision { target } => {
                run_log.warn(&format!(
                    "Name collision, skipped: {} -> {}",
                    path.display(),
                    target.display()
                ));
                Ok((path.to_path_buf(), true))
            }
        }
    }

    /// Renames the EXR sibling matching an HDR variant's duplicate index.
    fn pair_exr(
        &self,
        exr: Option<&PathBuf>,
        hdr_png: &Path,
        stem: &str,
        rename_log: &mut RenameLog,
        run_log: &RunLog,
    ) -> ConvertResult<()> {
        let Some(exr) = exr else {
            run_log.warn(&format!(
                "No EXR sibling for {}",
                hdr_png.display()
            ));
            return Ok(());
        };
        match rename::rename_exr_sibling(exr, stem, rename_log)? {
            ExrRenameOutcome::Renamed(_) => {}
            ExrRenameOutcome::SkippedCollision { target } => {
                run_log.warn(&format!(
                    "Name collision, skipped: {} -> {}",
                    exr.display(),
                    target.display()
                ));
            }
            ExrRenameOutcome::SourceMissing => {
                run_log.warn(&format!("EXR sibling disappeared: {}", exr.display()));
            }
        }
        Ok(())
    }

    async fn encode(
        &self,
        dispatcher: &CodecDispatcher,
        file: &Path,
        range: DynamicRange,
        run_log: &RunLog,
    ) -> ConvertResult<()> {
        if let Err(err) = dispatcher.encode(file, range).await {
            run_log.error(&format!("Encoding {} failed: {}", file.display(), err));
            return Err(err.into());
        }
        Ok(())
    }
}

/// Resets the single-flight flag even when the job task panics.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Single-flight executor for conversion jobs.
#[derive(Debug, Default)]
pub struct JobRunner {
    running: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new() -> Self {
        JobRunner::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts a job in the background, returning its event stream. Fails if
    /// another job from this runner is still in flight.
    pub fn start(&self, job: ConversionJob) -> ConvertResult<UnboundedReceiver<JobEvent>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ConvertError::JobAlreadyRunning);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let guard = RunningGuard(Arc::clone(&self.running));
        tokio::spawn(async move {
            let _guard = guard;
            match job.run(&tx).await {
                Ok(Outcome::Completed) => {
                    info!(input = %job.input_dir.display(), "conversion job completed");
                    send_status(&tx, "Processing completed", Severity::Success);
                    let _ = tx.send(JobEvent::Finished { success: true });
                }
                Ok(Outcome::NoSourceFiles) => {
                    let _ = tx.send(JobEvent::Finished { success: true });
                }
                Err(err) => {
                    error!(error = %err, "conversion job failed");
                    send_status(&tx, "Error - check logging.log", Severity::Error);
                    let _ = tx.send(JobEvent::Finished { success: false });
                }
            }
        });
        Ok(rx)
    }
}

fn send_progress(events: &UnboundedSender<JobEvent>, current: usize, total: usize) {
    let _ = events.send(JobEvent::Progress { current, total });
}

fn send_status(events: &UnboundedSender<JobEvent>, message: &str, severity: Severity) {
    let _ = events.send(JobEvent::Status {
        message: message.to_string(),
        severity,
    });
}
