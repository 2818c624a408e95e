//! Reconciliation run reporting

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{MatchMethod, MatchOutcome};

/// Aggregate counts for one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Deduplicated input tracks processed
    pub total: usize,
    /// Matched via cross-reference code
    pub exact_matched: usize,
    /// Matched via fuzzy text search
    pub fuzzy_matched: usize,
    /// No acceptable match found
    pub not_found: usize,
}

impl SyncStats {
    pub fn from_outcomes(outcomes: &[MatchOutcome]) -> Self {
        let mut stats = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome.method() {
                Some(MatchMethod::Exact) => stats.exact_matched += 1,
                Some(MatchMethod::Fuzzy) => stats.fuzzy_matched += 1,
                None => stats.not_found += 1,
            }
        }
        stats
    }

    pub fn matched(&self) -> usize {
        self.exact_matched + self.fuzzy_matched
    }

    /// Fraction of inputs matched, in [0, 1]. 0.0 for an empty run.
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.matched() as f64 / self.total as f64
    }
}

/// Result of one reconciliation run: one outcome per deduplicated input
/// track, in input order, plus aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<MatchOutcome>,
    pub stats: SyncStats,
    /// Id of the playlist written in the target catalog, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
}
