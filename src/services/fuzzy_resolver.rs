//! Fuzzy matching via free-text catalog search
//!
//! Fallback for tracks the exact phase could not place. Query variants are
//! ordered most-specific-first and the first query producing an acceptable
//! candidate wins; later variants are never consulted once a match is
//! accepted.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::catalog::TargetCatalog;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::matching::{
    calculate_similarity, extract_primary_title, normalize_for_comparison, strip_version_suffix,
    MatchTuning,
};
use crate::services::rate_limiter::RateLimiter;
use crate::types::{CatalogTrack, MatchMethod, MatchOutcome, SourceTrack};

pub struct FuzzyMatchResolver {
    catalog: Arc<dyn TargetCatalog>,
    catalog_limiter: Arc<RateLimiter>,
    tuning: MatchTuning,
    search_limit: usize,
    region: String,
}

impl FuzzyMatchResolver {
    pub fn new(
        catalog: Arc<dyn TargetCatalog>,
        catalog_limiter: Arc<RateLimiter>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            catalog,
            catalog_limiter,
            tuning: config.tuning.clone(),
            search_limit: config.search_limit,
            region: config.region.clone(),
        }
    }

    /// Ordered, deduplicated query variants for one track, most specific
    /// first: stripped title + artist, primary title + artist (only when the
    /// primary segment differs from the full normalized title), stripped
    /// title alone.
    pub fn build_queries(track: &SourceTrack) -> Vec<String> {
        let stripped = strip_version_suffix(&track.title);
        let normalized = normalize_for_comparison(&track.title);
        let primary = extract_primary_title(&normalized);
        let artist = track.artist.trim();

        let mut queries: Vec<String> = Vec::with_capacity(3);
        let mut push = |query: String| {
            let query = query.trim().to_string();
            if !query.is_empty() && !queries.contains(&query) {
                queries.push(query);
            }
        };

        push(format!("{stripped} {artist}"));
        if primary != normalized {
            push(format!("{primary} {artist}"));
        }
        push(stripped.clone());

        queries
    }

    /// Find the best acceptable candidate for one unmatched track.
    ///
    /// Per-query transient failures are logged and skipped; rate-limit,
    /// authorization and cancellation escalate.
    pub async fn resolve_track(
        &self,
        track: &SourceTrack,
        cancel: &CancellationToken,
    ) -> Result<MatchOutcome> {
        for query in Self::build_queries(track) {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            self.catalog_limiter.wait().await;
            let candidates = match self
                .catalog
                .search(&query, &self.region, self.search_limit)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        source_id = %track.source_id,
                        query = %query,
                        error = %e,
                        "Search query failed, trying next variant"
                    );
                    continue;
                }
            };

            if let Some((score, candidate)) = self.best_candidate(track, candidates) {
                if score >= self.tuning.acceptance_threshold {
                    tracing::debug!(
                        source_id = %track.source_id,
                        catalog_id = %candidate.catalog_id,
                        score,
                        query = %query,
                        "Accepted fuzzy match"
                    );
                    return Ok(MatchOutcome::Matched {
                        source: track.clone(),
                        catalog_track: candidate,
                        method: MatchMethod::Fuzzy,
                        confidence: score,
                    });
                }
                tracing::debug!(
                    source_id = %track.source_id,
                    score,
                    query = %query,
                    "Best candidate below threshold"
                );
            }
        }

        Ok(MatchOutcome::NotFound {
            source: track.clone(),
            reason: "best match below threshold".to_string(),
        })
    }

    fn best_candidate(
        &self,
        track: &SourceTrack,
        candidates: Vec<CatalogTrack>,
    ) -> Option<(f64, CatalogTrack)> {
        let mut best: Option<(f64, CatalogTrack)> = None;
        for candidate in candidates {
            let score = calculate_similarity(track, &candidate, &self.tuning);
            let better = match &best {
                Some((best_score, _)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((score, candidate));
            }
        }
        best
    }
}
