//! tracksync - track reconciliation between music catalogs
//!
//! Given a list of source tracks (title, artist, duration, opaque source
//! id), finds the best corresponding entry in a target catalog and reports
//! a per-track outcome. Matching runs in two stages: exact lookup via a
//! cross-reference code (ISRC), then a fuzzy free-text fallback scored by
//! normalized title/artist similarity with a duration guard.
//!
//! The external catalogs are consumed through the capability traits in
//! [`catalog`]; a MusicBrainz-backed [`services::MusicBrainzClient`] is
//! provided for cross-reference resolution. Everything else (playlist
//! fetching, credentials, presentation) belongs to the caller.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use tracksync::{MusicBrainzClient, ReconciliationOrchestrator, SyncConfig};
//!
//! let crossref = Arc::new(MusicBrainzClient::new()?);
//! let catalog = Arc::new(MyTargetCatalog::connect(token)?);
//! let orchestrator = ReconciliationOrchestrator::new(SyncConfig::default(), crossref, catalog);
//! let report = orchestrator.reconcile(tracks, CancellationToken::new()).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod matching;
pub mod progress;
pub mod report;
pub mod services;
pub mod types;

pub use catalog::{CrossRefResolver, PlaylistWriter, TargetCatalog};
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use progress::{Progress, SyncPhase};
pub use report::{SyncReport, SyncStats};
pub use services::{MusicBrainzClient, ReconciliationOrchestrator};
pub use types::{CatalogTrack, MatchMethod, MatchOutcome, SourceTrack};
