//! Weighted similarity scoring for track candidates
//!
//! Combines normalized title and artist comparison with a duration-based
//! multiplier into one confidence value in [0, 1]. Heuristics are tuned for
//! music titles and artists, not general-purpose string matching: quick
//! paths for equality and containment of normalized keys, Jaro-Winkler as
//! the fallback edit metric.

use serde::Deserialize;

use super::normalize::{extract_primary_title, normalize_artist, normalize_for_comparison};
use crate::types::{CatalogTrack, SourceTrack};

/// Tunable scoring weights and the fuzzy acceptance threshold.
///
/// Titles are weighted higher than artists because titles are more
/// discriminating; duration acts as a multiplicative guard rather than an
/// additive term.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchTuning {
    pub title_weight: f64,
    pub artist_weight: f64,
    /// Minimum combined score required to accept a fuzzy match
    pub acceptance_threshold: f64,
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            title_weight: 0.6,
            artist_weight: 0.4,
            acceptance_threshold: 0.7,
        }
    }
}

/// Similarity of two track titles in [0, 1].
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize_for_comparison(a);
    let norm_b = normalize_for_comparison(b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    if norm_a == norm_b {
        return 1.0;
    }
    if norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return 0.9;
    }

    // Compare the segments before any structural separator (medleys,
    // subtitle dashes) before falling back to the edit metric.
    let primary_a = extract_primary_title(&norm_a);
    let primary_b = extract_primary_title(&norm_b);
    if primary_a == primary_b {
        return 0.95;
    }
    if primary_a.contains(primary_b) || primary_b.contains(primary_a) {
        return 0.85;
    }

    strsim::jaro_winkler(primary_a, primary_b).max(strsim::jaro_winkler(&norm_a, &norm_b))
}

/// Similarity of two artist names in [0, 1].
pub fn artist_similarity(a: &str, b: &str) -> f64 {
    let norm_a = normalize_artist(a);
    let norm_b = normalize_artist(b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    if norm_a == norm_b {
        return 1.0;
    }
    if norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return 0.9;
    }
    strsim::jaro_winkler(&norm_a, &norm_b)
}

/// Duration-based multiplier in [0.70, 1.0].
///
/// Duration is optional metadata: an unknown duration (0) on either side
/// applies no penalty. Otherwise the multiplier steps down with the
/// absolute difference and never goes below 0.70, so a perfect text match
/// is downgraded but not zeroed by a bad duration.
pub fn duration_multiplier(ms_a: u64, ms_b: u64) -> f64 {
    if ms_a == 0 || ms_b == 0 {
        return 1.0;
    }
    match ms_a.abs_diff(ms_b) {
        0..=5_000 => 1.0,
        5_001..=15_000 => 0.95,
        15_001..=30_000 => 0.90,
        30_001..=60_000 => 0.80,
        _ => 0.70,
    }
}

/// Combined confidence that `candidate` is the same song as `source`.
pub fn calculate_similarity(
    source: &SourceTrack,
    candidate: &CatalogTrack,
    tuning: &MatchTuning,
) -> f64 {
    let title = title_similarity(&source.title, &candidate.title);
    let artist = artist_similarity(&source.artist, &candidate.artist);
    let text_score = tuning.title_weight * title + tuning.artist_weight * artist;
    text_score * duration_multiplier(source.duration_ms, candidate.duration_ms)
}
