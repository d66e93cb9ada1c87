//! Identity grouping.
//!
//! Buckets discovered files (SDR PNG, HDR PNG, EXR) by their canonical
//! identity. Grouping is a partition: every file lands in exactly one bucket
//! of exactly one group, and bucket order is case-insensitive lexicographic
//! by original filename, which is the tie-break for duplicate assignment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::naming;

/// All variants of one shot, keyed by identity in the [`GroupIndex`].
#[derive(Debug, Clone, Default)]
pub struct FileGroup {
    /// SDR PNG variants, case-insensitive filename order.
    pub sdr: Vec<PathBuf>,
    /// HDR PNG variants, case-insensitive filename order.
    pub hdr: Vec<PathBuf>,
    /// EXR variants, case-insensitive filename order.
    pub exr: Vec<PathBuf>,
}

/// Mapping from canonical identity to its variant buckets.
#[derive(Debug, Default)]
pub struct GroupIndex {
    groups: BTreeMap<String, FileGroup>,
}

impl GroupIndex {
    /// Buckets PNG and EXR files by identity. PNG files route to the SDR or
    /// HDR bucket per the normalizer's HDR flag; EXR files always route to
    /// the EXR bucket.
    pub fn build(png_files: &[PathBuf], exr_files: &[PathBuf]) -> Self {
        let mut index = GroupIndex::default();

        for path in png_files {
            let (identity, is_hdr) = naming::normalize_stem(&file_stem(path));
            let group = index.groups.entry(identity).or_default();
            if is_hdr {
                group.hdr.push(path.clone());
            } else {
                group.sdr.push(path.clone());
            }
        }

        for path in exr_files {
            let identity = naming::normalize_exr_stem(&file_stem(path));
            index.groups.entry(identity).or_default().exr.push(path.clone());
        }

        for group in index.groups.values_mut() {
            sort_by_name(&mut group.sdr);
            sort_by_name(&mut group.hdr);
            sort_by_name(&mut group.exr);
        }

        index
    }

    pub fn get(&self, identity: &str) -> Option<&FileGroup> {
        self.groups.get(identity)
    }

    /// Identities with at least one PNG variant, case-insensitive ascending.
    /// EXR-only groups are never sequenced or processed.
    pub fn identities_in_order(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .groups
            .iter()
            .filter(|(_, g)| !g.sdr.is_empty() || !g.hdr.is_empty())
            .map(|(k, _)| k.as_str())
            .collect();
        ids.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        ids
    }

    /// Number of identities that have at least one SDR variant. HDR-only
    /// identities do not extend the sequence-digit computation.
    pub fn sdr_identity_count(&self) -> usize {
        self.groups.values().filter(|g| !g.sdr.is_empty()).count()
    }

    /// Total SDR plus HDR PNG files; EXRs do not count as progress units.
    pub fn total_png_files(&self) -> usize {
        self.groups
            .values()
            .map(|g| g.sdr.len() + g.hdr.len())
            .sum()
    }

    /// Largest zero-based duplicate index across all SDR and HDR buckets.
    pub fn max_duplicate_index(&self) -> usize {
        self.groups
            .values()
            .flat_map(|g| [g.sdr.len(), g.hdr.len()])
            .map(|len| len.saturating_sub(1))
            .max()
            .unwrap_or(0)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sort_by_name(files: &mut [PathBuf]) {
    files.sort_by_key(|p| {
        p.file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    });
}
