//! Title and artist normalization
//!
//! Pure text transforms that turn differently-labeled renditions of the same
//! song into comparable keys: version-suffix stripping, punctuation and
//! diacritic folding, featuring-clause removal. No catalog knowledge here;
//! the scorer builds on these keys.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Closed vocabulary of qualifier clauses that labels append to titles.
/// Matched case-insensitively, only as a complete trailing clause.
const QUALIFIERS: &str = r"(?:\d{4}\s+)?remaster(?:ed)?(?:\s+\d{4})?|stereo|mono|single\s+version|deluxe\s+edition|original(?:\s+mix)?|live(?:\s+at\s+[^()\[\]]+|\s+version)?|bonus\s+track|[^-–—/()\[\]]*?remix|re-?recorded|(?:feat\.?|featuring|ft\.?)\s+[^()\[\]]+";

/// Trailing qualifier introduced by a dash or slash separator
static TRAILING_DASH_QUALIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&[r"(?i)\s*[-–—/]\s*(?:", QUALIFIERS, r")\s*$"].concat())
        .expect("invalid dash qualifier pattern")
});

/// Trailing qualifier enclosed in parentheses or brackets
static TRAILING_PAREN_QUALIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&[r"(?i)\s*[(\[]\s*(?:", QUALIFIERS, r")\s*[)\]]\s*$"].concat())
        .expect("invalid paren qualifier pattern")
});

/// Featuring clause anywhere in a title, removed to end of string
static FEAT_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\b(?:feat\.?|featuring|ft\.?)\s+.*$").expect("invalid feat pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace pattern"));

/// Remove trailing version-qualifier clauses from a title.
///
/// Only complete trailing clauses from the closed vocabulary are removed
/// ("Remastered 2014", "Live at Woodstock", "Mono", ...); text before the
/// separator is untouched. Applied repeatedly so stacked qualifiers like
/// `"Song (Live) - Remastered 2011"` reduce fully.
pub fn strip_version_suffix(title: &str) -> String {
    let mut current = title.trim().to_string();
    loop {
        let stripped = TRAILING_PAREN_QUALIFIER.replace(&current, "");
        let stripped = TRAILING_DASH_QUALIFIER.replace(stripped.as_ref(), "");
        let next = stripped.trim().to_string();
        if next.is_empty() || next == current {
            // A title that is nothing but a qualifier stays as-is
            return current;
        }
        current = next;
    }
}

/// Reduce a title to a comparison key.
///
/// Strips version suffixes, lowercases, folds diacritics (NFKD, combining
/// marks dropped), folds en/em dashes to hyphens, drops apostrophes, quotes,
/// parentheses and brackets, removes a featuring clause anywhere in the
/// string, replaces `" & "` with `" and "`, and collapses whitespace.
/// Idempotent: normalizing an already-normalized key is a no-op.
pub fn normalize_for_comparison(title: &str) -> String {
    let mut s = strip_version_suffix(title).to_lowercase();
    s = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    s = s.replace(['–', '—'], "-");
    s = s.replace(['\'', '’', '"', '“', '”', '(', ')', '[', ']'], "");
    s = FEAT_CLAUSE.replace(&s, "").into_owned();
    // Removing a featuring clause can expose a qualifier that was not
    // trailing before; strip again so the result is a fixpoint.
    s = strip_version_suffix(&s);
    s = WHITESPACE.replace_all(&s, " ").into_owned();
    s = s.replace(" & ", " and ");
    s.trim().to_string()
}

/// Text before the first structural separator (`" / "` or `" - "`) inside a
/// normalized title, e.g. the first entry of a medley. The whole string when
/// no separator is present.
pub fn extract_primary_title(normalized: &str) -> &str {
    let slash = normalized.find(" / ");
    let dash = normalized.find(" - ");
    let cut = match (slash, dash) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match cut {
        Some(i) => normalized[..i].trim_end(),
        None => normalized,
    }
}

/// Reduce an artist name to a comparison key: [`normalize_for_comparison`]
/// plus stripping one leading `"the "` token.
pub fn normalize_artist(artist: &str) -> String {
    let s = normalize_for_comparison(artist);
    match s.strip_prefix("the ") {
        Some(rest) => rest.to_string(),
        None => s,
    }
}
