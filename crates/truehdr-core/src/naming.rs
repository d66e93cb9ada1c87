//! Filename normalization.
//!
//! Recovers a canonical shot identity from a noisy filename stem: the `_HDR`
//! marker is removed (and remembered), trailing decorative annotations such as
//! `(1)` or `– copy` are stripped, and leftover separators are trimmed. Two
//! files share an identity iff they depict the same shot in different
//! variants.

/// HDR marker embedded in filename stems.
pub const HDR_MARKER: &str = "_HDR";

const DASHES: [char; 2] = ['\u{2013}', '\u{2014}'];

/// Derives the canonical identity and HDR flag from a filename stem.
///
/// The first `_HDR` occurrence is removed; the remainder is stripped of
/// trailing decorative fragments until stable, then trimmed of spaces,
/// underscores, and hyphens. A stem that is entirely decorative collapses to
/// the empty identity; grouping then collides all such files there, which is
/// accepted.
pub fn normalize_stem(stem: &str) -> (String, bool) {
    let (base, is_hdr) = match stem.find(HDR_MARKER) {
        Some(i) => (
            format!("{}{}", &stem[..i], &stem[i + HDR_MARKER.len()..]),
            true,
        ),
        None => (stem.to_owned(), false),
    };
    (strip_decorations(&base), is_hdr)
}

/// Normalizes an EXR stem. EXRs are HDR-only by convention, so every `_HDR`
/// marker is removed before the usual normalization.
pub fn normalize_exr_stem(stem: &str) -> String {
    strip_decorations(&stem.replace(HDR_MARKER, ""))
}

fn strip_decorations(base: &str) -> String {
    let mut current = base.to_owned();
    loop {
        match strip_trailing_fragment(&current) {
            Some(next) if next != current => current = next,
            _ => break,
        }
    }
    current.trim_matches([' ', '_', '-']).to_string()
}

/// Strips one trailing decorative fragment, or returns `None` if neither
/// pattern matches: a fully parenthesized fragment at end of string, or a
/// dash-led fragment with no parentheses up to end of string.
fn strip_trailing_fragment(s: &str) -> Option<String> {
    let s = s.trim_end();
    strip_paren_fragment(s).or_else(|| strip_dash_fragment(s))
}

fn strip_paren_fragment(s: &str) -> Option<String> {
    if !s.ends_with(')') {
        return None;
    }
    let open = s.rfind('(')?;
    let inner = &s[open + 1..s.len() - 1];
    if inner.contains('(') || inner.contains(')') {
        return None;
    }
    Some(s[..open].trim_end().to_string())
}

fn strip_dash_fragment(s: &str) -> Option<String> {
    for (i, c) in s.char_indices() {
        if DASHES.contains(&c)
            && s[..i].ends_with(|p: char| p.is_whitespace())
            && !s[i + c.len_utf8()..].contains(['(', ')'])
        {
            return Some(s[..i].trim_end().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_stem_passes_through() {
        assert_eq!(normalize_stem("My Shot"), ("My Shot".to_string(), false));
    }

    #[test]
    fn hdr_marker_is_stripped_and_flagged() {
        assert_eq!(normalize_stem("My Shot_HDR"), ("My Shot".to_string(), true));
        assert_eq!(
            normalize_stem("My Shot_HDR (1)"),
            ("My Shot".to_string(), true)
        );
    }

    #[test]
    fn only_first_hdr_marker_is_removed() {
        let (identity, is_hdr) = normalize_stem("a_HDR_b_HDR");
        assert!(is_hdr);
        assert_eq!(identity, "a_b_HDR");
    }

    #[test]
    fn trailing_parenthetical_is_stripped() {
        assert_eq!(normalize_stem("My Shot (1)").0, "My Shot");
        assert_eq!(normalize_stem("My Shot ( copy )").0, "My Shot");
    }

    #[test]
    fn dash_led_fragment_is_stripped() {
        assert_eq!(normalize_stem("My Shot \u{2013} copy").0, "My Shot");
        assert_eq!(normalize_stem("My Shot \u{2014} export 2").0, "My Shot");
    }

    #[test]
    fn fragments_are_stripped_repeatedly() {
        assert_eq!(normalize_stem("My Shot (1) (2)").0, "My Shot");
        assert_eq!(normalize_stem("My Shot \u{2013} copy (3)").0, "My Shot");
    }

    #[test]
    fn dash_without_leading_whitespace_is_kept() {
        assert_eq!(normalize_stem("Shot\u{2013}A").0, "Shot\u{2013}A");
    }

    #[test]
    fn nested_parentheses_do_not_crash() {
        // Nested/malformed parentheses have no guaranteed grouping; only the
        // non-crash and idempotence guarantees hold.
        let (identity, _) = normalize_stem("Shot (a (b))");
        assert_eq!(normalize_stem(&identity).0, identity);
    }

    #[test]
    fn fully_decorative_stem_collapses_to_empty() {
        assert_eq!(normalize_stem("(1)").0, "");
        assert_eq!(normalize_stem(" - _ ").0, "");
    }

    #[test]
    fn separators_are_trimmed() {
        assert_eq!(normalize_stem("_My Shot-").0, "My Shot");
    }

    #[test]
    fn normalization_is_idempotent() {
        for stem in ["My Shot (1)", "A_HDR", "x \u{2013} y", "plain"] {
            let (identity, _) = normalize_stem(stem);
            assert_eq!(normalize_stem(&identity).0, identity);
        }
    }

    #[test]
    fn exr_stems_drop_every_hdr_marker() {
        assert_eq!(normalize_exr_stem("My Shot_HDR"), "My Shot");
        assert_eq!(normalize_exr_stem("My Shot_HDR (1)"), "My Shot");
        assert_eq!(normalize_exr_stem("a_HDR_b_HDR"), "a_b");
    }
}
