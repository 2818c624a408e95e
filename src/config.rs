//! Configuration for a reconciliation run
//!
//! Resolution order is TOML file, then environment overrides. Every field
//! has a default tuned for the public catalogs this crate targets, so an
//! empty config is valid.

use std::path::Path;

use serde::Deserialize;

use crate::catalog::{CODE_LOOKUP_BATCH_LIMIT, PLAYLIST_ADD_BATCH_LIMIT};
use crate::error::{Result, SyncError};
use crate::matching::MatchTuning;

/// Environment variable overriding the catalog region tag
const ENV_REGION: &str = "TRACKSYNC_REGION";
/// Environment variable toggling the fuzzy fallback ("0"/"false" disables)
const ENV_FUZZY: &str = "TRACKSYNC_FUZZY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Region tag passed through to catalog queries
    pub region: String,
    /// Whether unmatched tracks fall through to fuzzy text search
    pub fuzzy_enabled: bool,
    /// Bounded parallelism for per-track phases
    pub max_concurrency: usize,
    /// Candidates requested per free-text search
    pub search_limit: usize,
    /// Codes per exact-lookup batch (provider limit 25)
    pub code_batch_size: usize,
    /// Track ids per playlist-insert batch (provider limit 100)
    pub playlist_batch_size: usize,
    /// Minimum spacing between cross-ref resolver calls
    pub crossref_interval_ms: u64,
    /// Minimum spacing between target catalog calls
    pub catalog_interval_ms: u64,
    /// Name of the playlist to create for matched tracks; `None` means
    /// report-only
    pub playlist_name: Option<String>,
    /// Scoring weights and acceptance threshold
    pub tuning: MatchTuning,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            region: "US".to_string(),
            fuzzy_enabled: true,
            max_concurrency: 10,
            search_limit: 10,
            code_batch_size: CODE_LOOKUP_BATCH_LIMIT,
            playlist_batch_size: PLAYLIST_ADD_BATCH_LIMIT,
            crossref_interval_ms: 1000,
            catalog_interval_ms: 110,
            playlist_name: None,
            tuning: MatchTuning::default(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file, apply environment overrides,
    /// and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: SyncConfig = toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, validated.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(region) = std::env::var(ENV_REGION) {
            if !region.trim().is_empty() {
                tracing::info!(region = %region, "Region overridden from environment");
                self.region = region.trim().to_string();
            }
        }
        if let Ok(fuzzy) = std::env::var(ENV_FUZZY) {
            let enabled = !matches!(fuzzy.trim().to_lowercase().as_str(), "0" | "false" | "no");
            tracing::info!(enabled, "Fuzzy matching toggled from environment");
            self.fuzzy_enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(SyncError::Config("max_concurrency must be at least 1".to_string()));
        }
        if self.search_limit == 0 {
            return Err(SyncError::Config("search_limit must be at least 1".to_string()));
        }
        if self.code_batch_size == 0 || self.code_batch_size > CODE_LOOKUP_BATCH_LIMIT {
            return Err(SyncError::Config(format!(
                "code_batch_size must be within 1..={CODE_LOOKUP_BATCH_LIMIT}"
            )));
        }
        if self.playlist_batch_size == 0 || self.playlist_batch_size > PLAYLIST_ADD_BATCH_LIMIT {
            return Err(SyncError::Config(format!(
                "playlist_batch_size must be within 1..={PLAYLIST_ADD_BATCH_LIMIT}"
            )));
        }
        let threshold = self.tuning.acceptance_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(SyncError::Config(
                "acceptance_threshold must be within (0, 1]".to_string(),
            ));
        }
        let weight_sum = self.tuning.title_weight + self.tuning.artist_weight;
        if self.tuning.title_weight < 0.0
            || self.tuning.artist_weight < 0.0
            || (weight_sum - 1.0).abs() > 1e-9
        {
            return Err(SyncError::Config(
                "title_weight and artist_weight must be non-negative and sum to 1.0".to_string(),
            ));
        }
        Ok(())
    }
}
