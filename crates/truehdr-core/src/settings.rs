//! Persisted run configuration.
//!
//! Settings round-trip as camelCase JSON; unknown fields are ignored and
//! missing fields take their defaults, so older settings files keep loading
//! across releases. `normalize()` runs after every load and mutation so the
//! engine only ever sees in-range values.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::{Codec, EncodeSpec};
use crate::sequencing::{NumberingPolicy, ZeroFillMode};

/// Settings filename inside the config directory.
pub const SETTINGS_FILE: &str = "settings.json";

const DEFAULT_PREFIX: &str = "Image_";
const MAX_START_COUNTER: u64 = 999_999;
const ZERO_FILL_DIGITS_RANGE: std::ops::RangeInclusive<u32> = 1..=9;
const MAX_QUALITY: u32 = 100;

/// Per-codec toggles and quality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodecSettings {
    pub enabled: bool,
    pub quality: u32,
}

impl Default for CodecSettings {
    fn default() -> Self {
        CodecSettings {
            enabled: true,
            quality: 99,
        }
    }
}

fn default_quality_for(codec: Codec) -> u32 {
    match codec {
        Codec::Jpeg => 95,
        _ => 99,
    }
}

fn default_codecs() -> BTreeMap<Codec, CodecSettings> {
    Codec::ALL
        .iter()
        .map(|&codec| {
            (
                codec,
                CodecSettings {
                    enabled: true,
                    quality: default_quality_for(codec),
                },
            )
        })
        .collect()
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub rename_enabled: bool,
    pub prefix: String,
    pub counter_enabled: bool,
    pub start_counter: u64,
    pub zero_fill_enabled: bool,
    pub zero_fill_mode: ZeroFillMode,
    pub zero_fill_digits: u32,
    pub sdr_enabled: bool,
    pub hdr_enabled: bool,
    pub last_input_dir: Option<String>,
    pub codecs: BTreeMap<Codec, CodecSettings>,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            rename_enabled: true,
            prefix: DEFAULT_PREFIX.to_string(),
            counter_enabled: true,
            start_counter: 1,
            zero_fill_enabled: true,
            zero_fill_mode: ZeroFillMode::default(),
            zero_fill_digits: 1,
            sdr_enabled: true,
            hdr_enabled: true,
            last_input_dir: None,
            codecs: default_codecs(),
        }
    }
}

impl AppSettings {
    /// Clamps every field into its legal range and backfills codec entries a
    /// stored file may be missing.
    pub fn normalize(&mut self) {
        if self.prefix.is_empty() {
            warn!("empty prefix in settings, restoring default");
            self.prefix = DEFAULT_PREFIX.to_string();
        }
        if self.start_counter > MAX_START_COUNTER {
            self.start_counter = MAX_START_COUNTER;
        }
        self.zero_fill_digits = self
            .zero_fill_digits
            .clamp(*ZERO_FILL_DIGITS_RANGE.start(), *ZERO_FILL_DIGITS_RANGE.end());

        for &codec in Codec::ALL.iter() {
            let entry = self.codecs.entry(codec).or_insert_with(|| CodecSettings {
                enabled: true,
                quality: default_quality_for(codec),
            });
            entry.quality = entry.quality.min(MAX_QUALITY);
        }
    }

    pub fn numbering_policy(&self) -> NumberingPolicy {
        NumberingPolicy {
            zero_fill_enabled: self.zero_fill_enabled,
            mode: self.zero_fill_mode,
            manual_digits: self.zero_fill_digits,
        }
    }

    /// Encode specs in canonical codec order.
    pub fn encode_specs(&self) -> Vec<EncodeSpec> {
        self.codecs
            .iter()
            .map(|(&codec, cfg)| EncodeSpec {
                codec,
                enabled: cfg.enabled,
                quality: cfg.quality,
            })
            .collect()
    }

    /// Loads settings from disk. A missing or unreadable file yields the
    /// defaults; a file that fails to parse is abandoned as a whole rather
    /// than salvaged field by field.
    pub fn load_or_default(path: &Path) -> Self {
        let mut settings = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<AppSettings>(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "settings file invalid, using defaults");
                    AppSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppSettings::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "settings file unreadable, using defaults");
                AppSettings::default()
            }
        };
        settings.normalize();
        settings
    }

    /// Writes settings atomically via a temp file in the same directory.
    pub fn save(&self, path: &Path) -> crate::ConvertResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_the_documented_values() {
        let settings = AppSettings::default();
        assert!(settings.rename_enabled);
        assert_eq!(settings.prefix, "Image_");
        assert_eq!(settings.start_counter, 1);
        assert_eq!(settings.zero_fill_digits, 1);
        assert_eq!(settings.codecs[&Codec::Jpeg].quality, 95);
        assert_eq!(settings.codecs[&Codec::Avif].quality, 99);
    }

    #[test]
    fn normalize_clamps_out_of_range_values() {
        let mut settings = AppSettings {
            prefix: String::new(),
            start_counter: 10_000_000,
            zero_fill_digits: 42,
            ..AppSettings::default()
        };
        settings.codecs.get_mut(&Codec::Heic).unwrap().quality = 250;

        settings.normalize();

        assert_eq!(settings.prefix, "Image_");
        assert_eq!(settings.start_counter, 999_999);
        assert_eq!(settings.zero_fill_digits, 9);
        assert_eq!(settings.codecs[&Codec::Heic].quality, 100);
    }

    #[test]
    fn normalize_backfills_missing_codecs() {
        let mut settings = AppSettings::default();
        settings.codecs.remove(&Codec::Jpegxl);

        settings.normalize();

        assert_eq!(settings.codecs.len(), 4);
        assert_eq!(settings.codecs[&Codec::Jpegxl].quality, 99);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"prefix": "Render_", "startCounter": 10}"#).unwrap();
        assert_eq!(settings.prefix, "Render_");
        assert_eq!(settings.start_counter, 10);
        assert!(settings.rename_enabled);
        assert_eq!(settings.codecs.len(), 4);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults_as_a_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{not json").unwrap();

        let settings = AppSettings::load_or_default(&path);
        assert_eq!(settings.prefix, "Image_");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let mut settings = AppSettings::default();
        settings.prefix = "Frame_".to_string();
        settings.codecs.get_mut(&Codec::Avif).unwrap().enabled = false;
        settings.save(&path).unwrap();

        let loaded = AppSettings::load_or_default(&path);
        assert_eq!(loaded.prefix, "Frame_");
        assert!(!loaded.codecs[&Codec::Avif].enabled);
    }

    #[test]
    fn encode_specs_follow_codec_order() {
        let specs = AppSettings::default().encode_specs();
        let codecs: Vec<Codec> = specs.iter().map(|s| s.codec).collect();
        assert_eq!(codecs, vec![Codec::Jpeg, Codec::Jpegxl, Codec::Heic, Codec::Avif]);
    }
}
