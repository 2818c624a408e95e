//! Core value types for track reconciliation
//!
//! All values are short-lived: constructed per run, held in memory for one
//! reconciliation pass, never persisted by this crate.

use serde::{Deserialize, Serialize};

/// A track from the source catalog, as fetched from the source playlist.
///
/// Never mutated in place; enrichment (attaching a resolved cross-reference
/// code) produces a new value via [`SourceTrack::with_cross_ref_code`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTrack {
    /// Opaque source-catalog identifier, unique and stable within a run
    pub source_id: String,
    /// Track title as labeled by the source catalog
    pub title: String,
    /// Primary artist as labeled by the source catalog
    pub artist: String,
    /// Duration in milliseconds (0 = unknown)
    #[serde(default)]
    pub duration_ms: u64,
    /// Cross-reference code (e.g. ISRC), if the source catalog carries one
    /// or the exact-match phase resolved one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_ref_code: Option<String>,
}

impl SourceTrack {
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            artist: artist.into(),
            duration_ms,
            cross_ref_code: None,
        }
    }

    /// Return a copy of this track enriched with a cross-reference code
    pub fn with_cross_ref_code(&self, code: impl Into<String>) -> Self {
        Self {
            cross_ref_code: Some(code.into()),
            ..self.clone()
        }
    }
}

/// A track entry in the target catalog. Produced only by catalog query
/// responses; read-only to the reconciliation core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    /// Target-catalog identifier
    pub catalog_id: String,
    /// Track title as labeled by the target catalog
    pub title: String,
    /// Primary artist as labeled by the target catalog
    pub artist: String,
    /// Duration in milliseconds (0 = unknown)
    #[serde(default)]
    pub duration_ms: u64,
    /// Cross-reference code, if the target catalog returned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_ref_code: Option<String>,
}

/// How a match was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    /// Cross-reference code lookup hit
    Exact,
    /// Free-text search candidate accepted above the similarity threshold
    Fuzzy,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::Fuzzy => "fuzzy",
        }
    }
}

/// Per-track reconciliation outcome.
///
/// Exactly one outcome exists per deduplicated input track, in input order.
/// Exact matches always carry confidence 1.0; fuzzy matches carry the
/// similarity score that cleared the acceptance threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// A corresponding target-catalog entry was found
    Matched {
        source: SourceTrack,
        catalog_track: CatalogTrack,
        method: MatchMethod,
        confidence: f64,
    },
    /// No acceptable target-catalog entry was found
    NotFound { source: SourceTrack, reason: String },
}

impl MatchOutcome {
    /// The source track this outcome belongs to
    pub fn source(&self) -> &SourceTrack {
        match self {
            MatchOutcome::Matched { source, .. } => source,
            MatchOutcome::NotFound { source, .. } => source,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched { .. })
    }

    /// Match method, if this outcome is a match
    pub fn method(&self) -> Option<MatchMethod> {
        match self {
            MatchOutcome::Matched { method, .. } => Some(*method),
            MatchOutcome::NotFound { .. } => None,
        }
    }
}
