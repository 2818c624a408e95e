//! Capability interfaces to the external catalogs
//!
//! The reconciliation core consumes these as trait objects and never sees
//! transport details. Implementations map their provider's failure modes
//! onto [`SyncError`]: 429/503 to `RateLimited`, 401/403 to `Unauthorized`,
//! anything transient to `Catalog` or `Parse`.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::CatalogTrack;

/// Hard provider limit on codes per exact-lookup call
pub const CODE_LOOKUP_BATCH_LIMIT: usize = 25;

/// Hard provider limit on track ids per playlist-insert call
pub const PLAYLIST_ADD_BATCH_LIMIT: usize = 100;

/// Resolves a cross-reference code (e.g. ISRC) for a title/artist pair.
///
/// Single-item lookups; the caller serializes calls behind the cross-ref
/// rate limiter.
#[async_trait]
pub trait CrossRefResolver: Send + Sync {
    /// Returns a code when the backing catalog knows one, `None` otherwise.
    async fn resolve(&self, title: &str, artist: &str) -> Result<Option<String>>;
}

/// Query capabilities of the target catalog.
#[async_trait]
pub trait TargetCatalog: Send + Sync {
    /// Exact lookup of up to [`CODE_LOOKUP_BATCH_LIMIT`] codes. Returns a
    /// map keyed by the codes the catalog recognized; absent keys mean the
    /// code is not present in the target catalog.
    async fn lookup_by_codes(
        &self,
        codes: &[String],
        region: &str,
    ) -> Result<HashMap<String, CatalogTrack>>;

    /// Free-text search, best `limit` candidates first. No ordering
    /// guarantee is assumed beyond "first N".
    async fn search(&self, query: &str, region: &str, limit: usize) -> Result<Vec<CatalogTrack>>;
}

/// Playlist creation and track insertion in the target catalog.
#[async_trait]
pub trait PlaylistWriter: Send + Sync {
    /// Create an empty playlist, returning its catalog id.
    async fn create_playlist(&self, name: &str, region: &str) -> Result<String>;

    /// Append up to [`PLAYLIST_ADD_BATCH_LIMIT`] tracks. Batches are issued
    /// sequentially by the orchestrator because insert order matters for
    /// idempotent retries.
    async fn add_tracks(&self, playlist_id: &str, catalog_ids: &[String]) -> Result<()>;
}
