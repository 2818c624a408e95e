//! End-to-end reconciliation tests against in-memory catalog doubles

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tracksync::{
    CatalogTrack, CrossRefResolver, MatchMethod, MatchOutcome, PlaylistWriter,
    ReconciliationOrchestrator, Result, SourceTrack, SyncConfig, SyncError, SyncPhase,
    TargetCatalog,
};

/// Cross-ref resolver backed by a fixed title -> code table
struct TableResolver {
    codes: HashMap<String, String>,
}

impl TableResolver {
    fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            codes: entries
                .iter()
                .map(|(title, code)| (title.to_string(), code.to_string()))
                .collect(),
        })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self { codes: HashMap::new() })
    }
}

#[async_trait]
impl CrossRefResolver for TableResolver {
    async fn resolve(&self, title: &str, _artist: &str) -> Result<Option<String>> {
        Ok(self.codes.get(title).cloned())
    }
}

/// Target catalog with a code index and a full-track search index
struct FakeCatalog {
    tracks: Vec<CatalogTrack>,
    search_delay: Duration,
}

impl FakeCatalog {
    fn new(tracks: Vec<CatalogTrack>) -> Arc<Self> {
        Arc::new(Self {
            tracks,
            search_delay: Duration::ZERO,
        })
    }
}

#[async_trait]
impl TargetCatalog for FakeCatalog {
    async fn lookup_by_codes(
        &self,
        codes: &[String],
        _region: &str,
    ) -> Result<HashMap<String, CatalogTrack>> {
        Ok(codes
            .iter()
            .filter_map(|code| {
                self.tracks
                    .iter()
                    .find(|t| {
                        t.cross_ref_code
                            .as_deref()
                            .is_some_and(|c| c.eq_ignore_ascii_case(code))
                    })
                    .map(|t| (code.clone(), t.clone()))
            })
            .collect())
    }

    async fn search(&self, query: &str, _region: &str, limit: usize) -> Result<Vec<CatalogTrack>> {
        if !self.search_delay.is_zero() {
            tokio::time::sleep(self.search_delay).await;
        }
        let query = query.to_lowercase();
        let mut hits: Vec<CatalogTrack> = self
            .tracks
            .iter()
            .filter(|t| {
                query.contains(&t.title.to_lowercase()) || t.title.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Playlist writer recording created playlists and insert batch sizes
#[derive(Default)]
struct RecordingWriter {
    created: Mutex<Vec<String>>,
    batches: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl PlaylistWriter for RecordingWriter {
    async fn create_playlist(&self, name: &str, _region: &str) -> Result<String> {
        self.created.lock().unwrap().push(name.to_string());
        Ok("pl-1".to_string())
    }

    async fn add_tracks(&self, playlist_id: &str, catalog_ids: &[String]) -> Result<()> {
        assert_eq!(playlist_id, "pl-1");
        self.batches.lock().unwrap().push(catalog_ids.to_vec());
        Ok(())
    }
}

fn catalog_track(id: &str, title: &str, artist: &str, duration_ms: u64, code: Option<&str>) -> CatalogTrack {
    CatalogTrack {
        catalog_id: id.into(),
        title: title.into(),
        artist: artist.into(),
        duration_ms,
        cross_ref_code: code.map(String::from),
    }
}

fn fast_config() -> SyncConfig {
    SyncConfig {
        crossref_interval_ms: 0,
        catalog_interval_ms: 0,
        ..SyncConfig::default()
    }
}

#[tokio::test]
async fn test_exact_then_fuzzy_end_to_end() -> anyhow::Result<()> {
    let crossref = TableResolver::new(&[("Fortunate Son", "USFI16900290")]);
    let catalog = FakeCatalog::new(vec![
        catalog_track("cat-1", "Fortunate Son", "Creedence Clearwater Revival", 139_000, Some("USFI16900290")),
        catalog_track("cat-2", "Suzie Q", "Creedence Clearwater Revival", 274_000, None),
    ]);

    let tracks = vec![
        SourceTrack::new("s1", "Fortunate Son", "CCR", 139_000),
        SourceTrack::new("s2", "Suzie Q (Remastered 2014)", "Creedence Clearwater Revival", 274_000),
        SourceTrack::new("s3", "Totally Unknown Song", "Nobody", 200_000),
    ];

    let orchestrator = ReconciliationOrchestrator::new(fast_config(), crossref, catalog);
    let progress = orchestrator.progress();
    let report = orchestrator
        .reconcile(tracks, CancellationToken::new())
        .await?;

    assert_eq!(report.outcomes.len(), 3);
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.source().source_id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2", "s3"]);

    match &report.outcomes[0] {
        MatchOutcome::Matched { method, confidence, catalog_track, .. } => {
            assert_eq!(*method, MatchMethod::Exact);
            assert_eq!(*confidence, 1.0);
            assert_eq!(catalog_track.catalog_id, "cat-1");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    match &report.outcomes[1] {
        MatchOutcome::Matched { method, confidence, catalog_track, .. } => {
            assert_eq!(*method, MatchMethod::Fuzzy);
            assert!(*confidence >= 0.7, "fuzzy confidence {confidence} below threshold");
            assert_eq!(catalog_track.catalog_id, "cat-2");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(&report.outcomes[2], MatchOutcome::NotFound { .. }));

    assert_eq!(report.stats.exact_matched, 1);
    assert_eq!(report.stats.fuzzy_matched, 1);
    assert_eq!(report.stats.not_found, 1);
    assert!(report.playlist_id.is_none());
    assert_eq!(progress.borrow().phase, SyncPhase::Done);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_source_ids_yield_one_outcome_each() -> anyhow::Result<()> {
    let catalog = FakeCatalog::new(vec![catalog_track(
        "cat-1",
        "Fortunate Son",
        "CCR",
        0,
        None,
    )]);

    let tracks = vec![
        SourceTrack::new("s1", "Fortunate Son", "CCR", 0),
        SourceTrack::new("s2", "Fortunate Son", "CCR", 0),
        SourceTrack::new("s1", "Fortunate Son", "CCR", 0),
    ];

    let orchestrator = ReconciliationOrchestrator::new(fast_config(), TableResolver::empty(), catalog);
    let report = orchestrator
        .reconcile(tracks, CancellationToken::new())
        .await?;

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].source().source_id, "s1");
    assert_eq!(report.outcomes[1].source().source_id, "s2");
    Ok(())
}

#[tokio::test]
async fn test_fuzzy_disabled_reports_skipped() -> anyhow::Result<()> {
    let catalog = FakeCatalog::new(vec![catalog_track(
        "cat-1",
        "Fortunate Son",
        "CCR",
        0,
        None,
    )]);

    let config = SyncConfig {
        fuzzy_enabled: false,
        ..fast_config()
    };
    let orchestrator = ReconciliationOrchestrator::new(config, TableResolver::empty(), catalog);
    let report = orchestrator
        .reconcile(
            vec![SourceTrack::new("s1", "Fortunate Son", "CCR", 0)],
            CancellationToken::new(),
        )
        .await?;

    match &report.outcomes[0] {
        MatchOutcome::NotFound { reason, .. } => assert_eq!(reason, "skipped"),
        other => panic!("unexpected outcome {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_during_fuzzy_escalates() {
    struct RateLimitedSearch;

    #[async_trait]
    impl TargetCatalog for RateLimitedSearch {
        async fn lookup_by_codes(
            &self,
            _: &[String],
            _: &str,
        ) -> Result<HashMap<String, CatalogTrack>> {
            Ok(HashMap::new())
        }
        async fn search(&self, _: &str, _: &str, _: usize) -> Result<Vec<CatalogTrack>> {
            Err(SyncError::RateLimited {
                retry_after: Some(Duration::from_secs(5)),
            })
        }
    }

    let orchestrator = ReconciliationOrchestrator::new(
        fast_config(),
        TableResolver::empty(),
        Arc::new(RateLimitedSearch),
    );
    let err = orchestrator
        .reconcile(
            vec![SourceTrack::new("s1", "Fortunate Son", "CCR", 0)],
            CancellationToken::new(),
        )
        .await
        .expect_err("expected escalation");

    match err {
        SyncError::RateLimited { retry_after } => {
            assert_eq!(retry_after, Some(Duration::from_secs(5)));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_during_code_resolution_escalates() {
    struct UnauthorizedResolver;

    #[async_trait]
    impl CrossRefResolver for UnauthorizedResolver {
        async fn resolve(&self, _: &str, _: &str) -> Result<Option<String>> {
            Err(SyncError::Unauthorized)
        }
    }

    let catalog = FakeCatalog::new(Vec::new());
    let orchestrator =
        ReconciliationOrchestrator::new(fast_config(), Arc::new(UnauthorizedResolver), catalog);
    let err = orchestrator
        .reconcile(
            vec![SourceTrack::new("s1", "Fortunate Son", "CCR", 0)],
            CancellationToken::new(),
        )
        .await
        .expect_err("expected escalation");
    assert!(matches!(err, SyncError::Unauthorized));
}

#[tokio::test]
async fn test_cancellation_mid_fuzzy_returns_cancelled() {
    let catalog = Arc::new(FakeCatalog {
        tracks: vec![catalog_track("cat-1", "Fortunate Son", "CCR", 0, None)],
        search_delay: Duration::from_secs(30),
    });

    let tracks: Vec<SourceTrack> = (0..20)
        .map(|i| SourceTrack::new(format!("s{i}"), format!("Song Number {i}"), "Artist", 0))
        .collect();

    let orchestrator =
        ReconciliationOrchestrator::new(fast_config(), TableResolver::empty(), catalog);
    let cancel = CancellationToken::new();
    let cancel_handle = cancel.clone();

    let run = tokio::spawn(async move { orchestrator.reconcile(tracks, cancel).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel_handle.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("reconciliation hung after cancellation")
        .expect("reconciliation task panicked");
    assert!(matches!(result, Err(SyncError::Cancelled)));
}

#[tokio::test]
async fn test_playlist_written_in_sequential_batches() -> anyhow::Result<()> {
    // 230 tracks, all exact-matchable via their source-supplied codes
    let catalog_tracks: Vec<CatalogTrack> = (0..230)
        .map(|i| {
            catalog_track(
                &format!("cat-{i}"),
                &format!("Song Number {i}"),
                "Artist",
                0,
                Some(&format!("CODE{i:08}")),
            )
        })
        .collect();
    let catalog = FakeCatalog::new(catalog_tracks);

    let tracks: Vec<SourceTrack> = (0..230)
        .map(|i| {
            SourceTrack::new(format!("s{i}"), format!("Song Number {i}"), "Artist", 0)
                .with_cross_ref_code(format!("CODE{i:08}"))
        })
        .collect();

    let writer = Arc::new(RecordingWriter::default());
    let config = SyncConfig {
        playlist_name: Some("Synced".to_string()),
        ..fast_config()
    };
    let orchestrator =
        ReconciliationOrchestrator::new(config, TableResolver::empty(), catalog)
            .with_playlist_writer(Arc::clone(&writer) as Arc<dyn PlaylistWriter>);

    let report = orchestrator
        .reconcile(tracks, CancellationToken::new())
        .await?;

    assert_eq!(report.stats.exact_matched, 230);
    assert_eq!(report.playlist_id.as_deref(), Some("pl-1"));
    assert_eq!(writer.created.lock().unwrap().as_slice(), ["Synced"]);

    let batches = writer.batches.lock().unwrap();
    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![100, 100, 30]);
    // Insert order follows outcome order
    assert_eq!(batches[0][0], "cat-0");
    assert_eq!(batches[2][29], "cat-229");
    Ok(())
}

#[tokio::test]
async fn test_completed_items_keep_results_alongside_failures() -> anyhow::Result<()> {
    // One track matches fuzzily, one track's searches always fail
    // transiently; the batch still completes with one outcome per track.
    struct HalfBrokenCatalog {
        inner: Arc<FakeCatalog>,
    }

    #[async_trait]
    impl TargetCatalog for HalfBrokenCatalog {
        async fn lookup_by_codes(
            &self,
            codes: &[String],
            region: &str,
        ) -> Result<HashMap<String, CatalogTrack>> {
            self.inner.lookup_by_codes(codes, region).await
        }
        async fn search(&self, query: &str, region: &str, limit: usize) -> Result<Vec<CatalogTrack>> {
            if query.contains("Broken") {
                return Err(SyncError::Catalog("connection reset".into()));
            }
            self.inner.search(query, region, limit).await
        }
    }

    let inner = FakeCatalog::new(vec![catalog_track("cat-1", "Fortunate Son", "CCR", 0, None)]);
    let orchestrator = ReconciliationOrchestrator::new(
        fast_config(),
        TableResolver::empty(),
        Arc::new(HalfBrokenCatalog { inner }),
    );

    let report = orchestrator
        .reconcile(
            vec![
                SourceTrack::new("s1", "Fortunate Son", "CCR", 0),
                SourceTrack::new("s2", "Broken Song", "Broken Artist", 0),
            ],
            CancellationToken::new(),
        )
        .await?;

    assert_eq!(report.outcomes.len(), 2);
    assert!(report.outcomes[0].is_matched());
    assert!(matches!(&report.outcomes[1], MatchOutcome::NotFound { .. }));
    Ok(())
}
