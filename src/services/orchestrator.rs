//! Reconciliation pipeline orchestration
//!
//! Drives the exact phase over the whole deduplicated batch, fans the
//! remainder out to fuzzy matching with bounded parallelism, merges results
//! in input order, and optionally writes the matched subset to a target
//! playlist. Result slots are index-addressed so completion order of
//! concurrent lookups never affects output order.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::catalog::{CrossRefResolver, PlaylistWriter, TargetCatalog};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::progress::{Progress, ProgressTracker, SyncPhase};
use crate::report::{SyncReport, SyncStats};
use crate::services::exact_resolver::ExactMatchResolver;
use crate::services::fuzzy_resolver::FuzzyMatchResolver;
use crate::services::rate_limiter::RateLimiter;
use crate::types::{MatchOutcome, SourceTrack};

pub struct ReconciliationOrchestrator {
    config: SyncConfig,
    crossref: Arc<dyn CrossRefResolver>,
    catalog: Arc<dyn TargetCatalog>,
    playlist_writer: Option<Arc<dyn PlaylistWriter>>,
    crossref_limiter: Arc<RateLimiter>,
    catalog_limiter: Arc<RateLimiter>,
    progress: ProgressTracker,
}

impl ReconciliationOrchestrator {
    pub fn new(
        config: SyncConfig,
        crossref: Arc<dyn CrossRefResolver>,
        catalog: Arc<dyn TargetCatalog>,
    ) -> Self {
        let crossref_limiter = Arc::new(RateLimiter::from_millis(config.crossref_interval_ms));
        let catalog_limiter = Arc::new(RateLimiter::from_millis(config.catalog_interval_ms));
        Self {
            config,
            crossref,
            catalog,
            playlist_writer: None,
            crossref_limiter,
            catalog_limiter,
            progress: ProgressTracker::new(),
        }
    }

    /// Enable playlist creation for the matched subset. Without a writer
    /// (or without `playlist_name` in the config) reconciliation is
    /// report-only.
    pub fn with_playlist_writer(mut self, writer: Arc<dyn PlaylistWriter>) -> Self {
        self.playlist_writer = Some(writer);
        self
    }

    /// Subscribe to advisory progress snapshots
    pub fn progress(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Reconcile one batch of source tracks against the target catalog.
    ///
    /// Returns one outcome per deduplicated input track, in input order.
    /// Rate-limit, authorization and cancellation failures abort the run
    /// with the corresponding [`SyncError`]; everything else degrades to
    /// per-track `NotFound` outcomes.
    pub async fn reconcile(
        &self,
        tracks: Vec<SourceTrack>,
        cancel: CancellationToken,
    ) -> Result<SyncReport> {
        let started_at = Utc::now();
        let deduped = dedup_by_source_id(tracks);
        tracing::info!(total = deduped.len(), "Starting reconciliation");

        let exact_resolver = ExactMatchResolver::new(
            Arc::clone(&self.crossref),
            Arc::clone(&self.catalog),
            Arc::clone(&self.crossref_limiter),
            Arc::clone(&self.catalog_limiter),
            &self.config,
        );
        let exact = exact_resolver.run(&deduped, &cancel, &self.progress).await?;

        let mut fuzzy_slots: Vec<Option<MatchOutcome>> = vec![None; deduped.len()];
        if self.config.fuzzy_enabled && !exact.unmatched.is_empty() {
            self.run_fuzzy_phase(exact.unmatched, &mut fuzzy_slots, &cancel)
                .await?;
        } else if !exact.unmatched.is_empty() {
            tracing::info!(
                skipped = exact.unmatched.len(),
                "Fuzzy matching disabled, reporting remainder as skipped"
            );
        }

        let outcomes = merge_outcomes(&deduped, exact.matched, fuzzy_slots);

        let playlist_id = self.write_playlist(&outcomes, &cancel).await?;

        let stats = SyncStats::from_outcomes(&outcomes);
        self.progress.begin_phase(SyncPhase::Done, 0);
        tracing::info!(
            total = stats.total,
            exact = stats.exact_matched,
            fuzzy = stats.fuzzy_matched,
            not_found = stats.not_found,
            "Reconciliation complete"
        );

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
            stats,
            playlist_id,
        })
    }

    /// Fan unmatched tracks out to fuzzy matching, bounded parallelism.
    ///
    /// Each worker writes only the slot matching its input index, so
    /// partial cancellation cannot corrupt already-written results.
    async fn run_fuzzy_phase(
        &self,
        unmatched: Vec<(usize, SourceTrack)>,
        fuzzy_slots: &mut [Option<MatchOutcome>],
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.progress.begin_phase(SyncPhase::FuzzyMatching, unmatched.len());

        let resolver = Arc::new(FuzzyMatchResolver::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.catalog_limiter),
            &self.config,
        ));

        let mut searches = stream::iter(unmatched)
            .map(|(idx, track)| {
                let resolver = Arc::clone(&resolver);
                let cancel = cancel.clone();
                async move {
                    let result = tokio::select! {
                        _ = cancel.cancelled() => Err(SyncError::Cancelled),
                        result = resolver.resolve_track(&track, &cancel) => result,
                    };
                    (idx, result)
                }
            })
            .buffer_unordered(self.config.max_concurrency);

        let mut first_fatal: Option<SyncError> = None;
        while let Some((idx, result)) = searches.next().await {
            match result {
                Ok(outcome) => {
                    debug_assert!(fuzzy_slots[idx].is_none(), "slot {idx} written twice");
                    fuzzy_slots[idx] = Some(outcome);
                    self.progress.tick();
                }
                Err(e) => {
                    if first_fatal.is_none() {
                        cancel.cancel();
                        first_fatal = Some(e);
                    }
                }
            }
        }
        drop(searches);

        if let Some(e) = first_fatal {
            return Err(e);
        }
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Write the matched subset to a new target-catalog playlist, in
    /// outcome order, in sequential batches. Write failures abort the run:
    /// insert order matters for idempotent retries, so skipping a failed
    /// batch would corrupt the playlist.
    async fn write_playlist(
        &self,
        outcomes: &[MatchOutcome],
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let (Some(writer), Some(name)) = (&self.playlist_writer, &self.config.playlist_name) else {
            return Ok(None);
        };

        let catalog_ids: Vec<String> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                MatchOutcome::Matched { catalog_track, .. } => {
                    Some(catalog_track.catalog_id.clone())
                }
                MatchOutcome::NotFound { .. } => None,
            })
            .collect();

        if catalog_ids.is_empty() {
            tracing::info!(playlist = %name, "No matched tracks, skipping playlist creation");
            return Ok(None);
        }

        let batches = catalog_ids.len().div_ceil(self.config.playlist_batch_size);
        self.progress.begin_phase(SyncPhase::WritingPlaylist, batches);

        self.catalog_limiter.wait().await;
        let playlist_id = writer.create_playlist(name, &self.config.region).await?;
        tracing::info!(playlist = %name, playlist_id = %playlist_id, tracks = catalog_ids.len(), "Created playlist");

        for chunk in catalog_ids.chunks(self.config.playlist_batch_size) {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            self.catalog_limiter.wait().await;
            writer.add_tracks(&playlist_id, chunk).await?;
            self.progress.tick();
        }

        Ok(Some(playlist_id))
    }
}

/// Drop repeated source ids, keeping the first occurrence of each
fn dedup_by_source_id(tracks: Vec<SourceTrack>) -> Vec<SourceTrack> {
    let mut seen: HashSet<String> = HashSet::with_capacity(tracks.len());
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.source_id.clone()))
        .collect()
}

/// Merge per-phase result slots into the final ordered outcome list.
///
/// Pure function of the two result sets and the ordered input: for each
/// input track, its exact match wins, else its fuzzy result, else
/// `NotFound("skipped")`. Never drops or duplicates a track.
fn merge_outcomes(
    tracks: &[SourceTrack],
    exact: Vec<Option<MatchOutcome>>,
    fuzzy: Vec<Option<MatchOutcome>>,
) -> Vec<MatchOutcome> {
    debug_assert_eq!(tracks.len(), exact.len());
    debug_assert_eq!(tracks.len(), fuzzy.len());

    tracks
        .iter()
        .zip(exact.into_iter().zip(fuzzy))
        .map(|(track, (exact_slot, fuzzy_slot))| {
            exact_slot.or(fuzzy_slot).unwrap_or_else(|| MatchOutcome::NotFound {
                source: track.clone(),
                reason: "skipped".to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CatalogTrack, MatchMethod};

    fn track(id: &str) -> SourceTrack {
        SourceTrack::new(id, format!("Title {id}"), "Artist", 0)
    }

    fn matched(source: &SourceTrack, method: MatchMethod, confidence: f64) -> MatchOutcome {
        MatchOutcome::Matched {
            source: source.clone(),
            catalog_track: CatalogTrack {
                catalog_id: format!("cat-{}", source.source_id),
                title: source.title.clone(),
                artist: source.artist.clone(),
                duration_ms: 0,
                cross_ref_code: None,
            },
            method,
            confidence,
        }
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let tracks = vec![track("a"), track("b"), track("a"), track("c"), track("b")];
        let deduped = dedup_by_source_id(tracks);
        let ids: Vec<&str> = deduped.iter().map(|t| t.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_merge_preserves_cardinality_and_order() {
        let tracks = vec![track("a"), track("b"), track("c"), track("d")];
        let exact = vec![Some(matched(&tracks[0], MatchMethod::Exact, 1.0)), None, None, None];
        let fuzzy = vec![None, None, Some(matched(&tracks[2], MatchMethod::Fuzzy, 0.8)), None];

        let merged = merge_outcomes(&tracks, exact, fuzzy);
        assert_eq!(merged.len(), tracks.len());
        for (outcome, input) in merged.iter().zip(&tracks) {
            assert_eq!(outcome.source().source_id, input.source_id);
        }
        assert_eq!(merged[0].method(), Some(MatchMethod::Exact));
        assert_eq!(merged[2].method(), Some(MatchMethod::Fuzzy));
    }

    #[test]
    fn test_merge_exact_wins_over_fuzzy() {
        let tracks = vec![track("a")];
        let exact = vec![Some(matched(&tracks[0], MatchMethod::Exact, 1.0))];
        let fuzzy = vec![Some(matched(&tracks[0], MatchMethod::Fuzzy, 0.9))];

        let merged = merge_outcomes(&tracks, exact, fuzzy);
        assert_eq!(merged[0].method(), Some(MatchMethod::Exact));
    }

    #[test]
    fn test_merge_fills_skipped_for_unprocessed_tracks() {
        let tracks = vec![track("a"), track("b")];
        let merged = merge_outcomes(&tracks, vec![None, None], vec![None, None]);
        for outcome in &merged {
            match outcome {
                MatchOutcome::NotFound { reason, .. } => assert_eq!(reason, "skipped"),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
    }
}
