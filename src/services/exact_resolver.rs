//! Exact matching via cross-reference codes
//!
//! Two phases per run: resolve missing codes through the single-item
//! cross-ref capability (bounded fan-out, calls serialized by the cross-ref
//! rate limiter), then look the coded tracks up in the target catalog in
//! batches. A code that exists in the source catalog does not guarantee
//! presence in the target catalog; misses are routed to fuzzy matching.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::catalog::{CrossRefResolver, TargetCatalog};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::progress::{ProgressTracker, SyncPhase};
use crate::services::rate_limiter::RateLimiter;
use crate::types::{CatalogTrack, MatchMethod, MatchOutcome, SourceTrack};

/// Outcome of the exact-match phase over one deduplicated batch
#[derive(Debug)]
pub struct ExactPhaseResult {
    /// One slot per input index; `None` routes the track to fuzzy matching
    pub matched: Vec<Option<MatchOutcome>>,
    /// Tracks still unmatched, code-enriched where resolution succeeded
    pub unmatched: Vec<(usize, SourceTrack)>,
}

pub struct ExactMatchResolver {
    crossref: Arc<dyn CrossRefResolver>,
    catalog: Arc<dyn TargetCatalog>,
    crossref_limiter: Arc<RateLimiter>,
    catalog_limiter: Arc<RateLimiter>,
    max_concurrency: usize,
    code_batch_size: usize,
    region: String,
}

impl ExactMatchResolver {
    pub fn new(
        crossref: Arc<dyn CrossRefResolver>,
        catalog: Arc<dyn TargetCatalog>,
        crossref_limiter: Arc<RateLimiter>,
        catalog_limiter: Arc<RateLimiter>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            crossref,
            catalog,
            crossref_limiter,
            catalog_limiter,
            max_concurrency: config.max_concurrency,
            code_batch_size: config.code_batch_size,
            region: config.region.clone(),
        }
    }

    pub async fn run(
        &self,
        tracks: &[SourceTrack],
        cancel: &CancellationToken,
        progress: &ProgressTracker,
    ) -> Result<ExactPhaseResult> {
        let enriched = self.resolve_codes(tracks, cancel, progress).await?;
        self.lookup_codes(enriched, cancel, progress).await
    }

    /// Attach cross-reference codes to tracks that lack one.
    ///
    /// Per-item transient failures downgrade to "no code"; rate-limit,
    /// authorization and cancellation escalate and cancel queued work.
    async fn resolve_codes(
        &self,
        tracks: &[SourceTrack],
        cancel: &CancellationToken,
        progress: &ProgressTracker,
    ) -> Result<Vec<SourceTrack>> {
        let pending: Vec<(usize, SourceTrack)> = tracks
            .iter()
            .cloned()
            .enumerate()
            .filter(|(_, track)| track.cross_ref_code.is_none())
            .collect();

        progress.begin_phase(SyncPhase::ResolvingCodes, pending.len());
        tracing::debug!(
            total = tracks.len(),
            pending = pending.len(),
            "Resolving cross-reference codes"
        );

        let mut enriched: Vec<SourceTrack> = tracks.to_vec();
        if pending.is_empty() {
            return Ok(enriched);
        }

        let mut lookups = stream::iter(pending)
            .map(|(idx, track)| {
                let crossref = Arc::clone(&self.crossref);
                let limiter = Arc::clone(&self.crossref_limiter);
                let cancel = cancel.clone();
                async move {
                    let resolve = async {
                        limiter.wait().await;
                        crossref.resolve(&track.title, &track.artist).await
                    };
                    let result = tokio::select! {
                        _ = cancel.cancelled() => Err(SyncError::Cancelled),
                        result = resolve => result,
                    };
                    match result {
                        Ok(code) => Ok((idx, code)),
                        Err(e) if e.is_fatal() => Err(e),
                        Err(e) => {
                            tracing::warn!(
                                source_id = %track.source_id,
                                error = %e,
                                "Cross-ref resolution failed, track goes to fuzzy matching"
                            );
                            Ok((idx, None))
                        }
                    }
                }
            })
            .buffer_unordered(self.max_concurrency);

        let mut first_fatal: Option<SyncError> = None;
        while let Some(result) = lookups.next().await {
            match result {
                Ok((idx, Some(code))) => {
                    enriched[idx] = enriched[idx].with_cross_ref_code(code);
                    progress.tick();
                }
                Ok((_, None)) => progress.tick(),
                Err(e) => {
                    if first_fatal.is_none() {
                        cancel.cancel();
                        first_fatal = Some(e);
                    }
                }
            }
        }
        drop(lookups);

        if let Some(e) = first_fatal {
            return Err(e);
        }
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(enriched)
    }

    /// Batched exact lookup of all coded tracks against the target catalog.
    ///
    /// Batches are issued sequentially; codes are compared case-insensitively
    /// and the first hit wins on duplicate codes within a batch.
    async fn lookup_codes(
        &self,
        enriched: Vec<SourceTrack>,
        cancel: &CancellationToken,
        progress: &ProgressTracker,
    ) -> Result<ExactPhaseResult> {
        let total = enriched.len();
        let coded: Vec<(usize, SourceTrack)> = enriched
            .iter()
            .cloned()
            .enumerate()
            .filter(|(_, track)| track.cross_ref_code.is_some())
            .collect();

        progress.begin_phase(SyncPhase::ExactLookup, coded.len());
        let mut matched: Vec<Option<MatchOutcome>> = vec![None; total];

        for chunk in coded.chunks(self.code_batch_size) {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let mut codes: Vec<String> = Vec::with_capacity(chunk.len());
            for (_, track) in chunk {
                if let Some(code) = track.cross_ref_code.as_deref() {
                    let code = code.to_uppercase();
                    if !codes.contains(&code) {
                        codes.push(code);
                    }
                }
            }

            self.catalog_limiter.wait().await;
            let found = match self.catalog.lookup_by_codes(&codes, &self.region).await {
                Ok(map) => map,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        batch = codes.len(),
                        error = %e,
                        "Exact lookup batch failed, routing batch to fuzzy matching"
                    );
                    for _ in chunk {
                        progress.tick();
                    }
                    continue;
                }
            };

            // Case-insensitive code index; first hit wins on duplicates
            let mut by_code: HashMap<String, CatalogTrack> = HashMap::new();
            for (code, track) in found {
                by_code.entry(code.to_uppercase()).or_insert(track);
            }

            for (idx, track) in chunk {
                if let Some(code) = track.cross_ref_code.as_deref() {
                    if let Some(hit) = by_code.get(&code.to_uppercase()) {
                        matched[*idx] = Some(MatchOutcome::Matched {
                            source: track.clone(),
                            catalog_track: hit.clone(),
                            method: MatchMethod::Exact,
                            confidence: 1.0,
                        });
                    }
                }
                progress.tick();
            }
        }

        let unmatched: Vec<(usize, SourceTrack)> = enriched
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| matched[*idx].is_none())
            .collect();

        tracing::info!(
            total,
            exact = total - unmatched.len(),
            remaining = unmatched.len(),
            "Exact match phase complete"
        );

        Ok(ExactPhaseResult { matched, unmatched })
    }
}
