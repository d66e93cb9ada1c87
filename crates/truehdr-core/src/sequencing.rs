//! Sequence number assignment and zero-fill math.
//!
//! Identities receive consecutive numbers in their canonical order; duplicate
//! variants within an identity receive fixed-width suffixes. Width is decided
//! once per run, before any file is touched, so early and late files in the
//! same run always pad identically.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How sequence-number widths are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroFillMode {
    /// Width derived from the largest number assigned in this run.
    #[default]
    Auto,
    /// User-chosen width, raised to the automatic width when too small.
    Manual,
}

/// Numbering knobs as they arrive from settings.
#[derive(Debug, Clone, Copy)]
pub struct NumberingPolicy {
    pub zero_fill_enabled: bool,
    pub mode: ZeroFillMode,
    pub manual_digits: u32,
}

/// Decimal digit count of `n` (at least 1).
pub fn digit_count(n: u64) -> u32 {
    n.checked_ilog10().unwrap_or(0) + 1
}

/// Width for sequence numbers over `count` identities starting at `start`.
///
/// With no identities to number there is nothing automatic to derive: manual
/// mode keeps its configured width, auto mode falls back to 1. Manual widths
/// smaller than the automatic requirement are raised, not truncated.
pub fn sequence_digits(start: u64, count: usize, mode: ZeroFillMode, manual_digits: u32) -> u32 {
    if count == 0 {
        return match mode {
            ZeroFillMode::Manual => manual_digits,
            ZeroFillMode::Auto => 1,
        };
    }
    let auto = digit_count(start + count as u64 - 1);
    match mode {
        ZeroFillMode::Auto => auto,
        ZeroFillMode::Manual => {
            if manual_digits < auto {
                warn!(
                    manual_digits,
                    required = auto,
                    "manual zero-fill width too small for this run, raising it"
                );
            }
            manual_digits.max(auto)
        }
    }
}

/// Width for duplicate suffixes given the largest zero-based duplicate index.
pub fn duplicate_digits(max_duplicate_index: usize) -> u32 {
    digit_count(max_duplicate_index as u64).max(1)
}

/// Frozen number assignment for one run.
#[derive(Debug)]
pub struct SequencePlan {
    numbers: HashMap<String, u64>,
    sequence_digits: u32,
    duplicate_digits: u32,
    zero_fill_enabled: bool,
}

impl SequencePlan {
    pub fn new(
        identities: &[&str],
        start: u64,
        sequence_digits: u32,
        duplicate_digits: u32,
        zero_fill_enabled: bool,
    ) -> Self {
        let numbers = identities
            .iter()
            .enumerate()
            .map(|(i, id)| (id.to_string(), start + i as u64))
            .collect();
        SequencePlan {
            numbers,
            sequence_digits,
            duplicate_digits,
            zero_fill_enabled,
        }
    }

    pub fn number_of(&self, identity: &str) -> Option<u64> {
        self.numbers.get(identity).copied()
    }

    /// Renders an identity's number, zero-padded when padding is enabled.
    pub fn render_number(&self, identity: &str) -> Option<String> {
        let n = self.number_of(identity)?;
        Some(if self.zero_fill_enabled {
            format!("{:0width$}", n, width = self.sequence_digits as usize)
        } else {
            n.to_string()
        })
    }

    /// Suffix for a zero-based duplicate index. The primary variant (index 0)
    /// carries no suffix; duplicates are always zero-padded regardless of the
    /// sequence-number padding toggle.
    pub fn duplicate_suffix(&self, index: usize) -> String {
        if index == 0 {
            String::new()
        } else {
            format!(
                "_Duplicate{:0width$}",
                index,
                width = self.duplicate_digits as usize
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_count_basics() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(999), 3);
        assert_eq!(digit_count(1000), 4);
    }

    #[test]
    fn auto_width_covers_the_last_number() {
        // 98, 99, 100: the widest assigned number decides.
        assert_eq!(sequence_digits(98, 3, ZeroFillMode::Auto, 1), 3);
        assert_eq!(sequence_digits(1, 9, ZeroFillMode::Auto, 1), 1);
        assert_eq!(sequence_digits(1, 10, ZeroFillMode::Auto, 1), 2);
    }

    #[test]
    fn manual_width_is_raised_when_too_small() {
        assert_eq!(sequence_digits(1, 200, ZeroFillMode::Manual, 2), 3);
        assert_eq!(sequence_digits(1, 5, ZeroFillMode::Manual, 4), 4);
    }

    #[test]
    fn zero_identities_fall_back_per_mode() {
        assert_eq!(sequence_digits(1, 0, ZeroFillMode::Auto, 5), 1);
        assert_eq!(sequence_digits(1, 0, ZeroFillMode::Manual, 5), 5);
    }

    #[test]
    fn duplicate_digits_has_a_floor_of_one() {
        assert_eq!(duplicate_digits(0), 1);
        assert_eq!(duplicate_digits(9), 1);
        assert_eq!(duplicate_digits(10), 2);
    }

    #[test]
    fn numbers_follow_identity_order() {
        let plan = SequencePlan::new(&["a", "b", "c"], 5, 1, 1, true);
        assert_eq!(plan.number_of("a"), Some(5));
        assert_eq!(plan.number_of("c"), Some(7));
        assert_eq!(plan.number_of("missing"), None);
    }

    #[test]
    fn render_pads_only_when_enabled() {
        let padded = SequencePlan::new(&["a"], 7, 3, 1, true);
        assert_eq!(padded.render_number("a").as_deref(), Some("007"));

        let bare = SequencePlan::new(&["a"], 7, 3, 1, false);
        assert_eq!(bare.render_number("a").as_deref(), Some("7"));
    }

    #[test]
    fn duplicate_suffix_formats() {
        let plan = SequencePlan::new(&["a"], 1, 1, 2, true);
        assert_eq!(plan.duplicate_suffix(0), "");
        assert_eq!(plan.duplicate_suffix(1), "_Duplicate01");
        assert_eq!(plan.duplicate_suffix(12), "_Duplicate12");
    }
}
