//! MusicBrainz-backed cross-reference code resolver
//!
//! Searches the MusicBrainz recording index for a title/artist pair and
//! returns the first ISRC of a sufficiently similar recording. MusicBrainz
//! allows one request per second for anonymous clients; the caller is
//! expected to serialize calls behind the cross-ref rate limiter.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::catalog::CrossRefResolver;
use crate::error::{Result, SyncError};

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = "tracksync/0.1.0 (https://github.com/tracksync/tracksync)";
const SEARCH_LIMIT: u32 = 5;

/// Minimum Jaro-Winkler similarity on both title and artist before a
/// recording's ISRC is trusted
const ACCEPT_SIMILARITY: f64 = 0.85;

/// MusicBrainz recording search response
#[derive(Debug, Deserialize)]
struct MBSearchResponse {
    #[serde(default)]
    recordings: Vec<MBRecording>,
}

#[derive(Debug, Deserialize)]
struct MBRecording {
    /// Recording title
    title: String,
    /// ISRCs registered for this recording
    #[serde(default)]
    isrcs: Vec<String>,
    /// Artist credits for this recording
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MBArtistCredit>,
}

#[derive(Debug, Deserialize)]
struct MBArtistCredit {
    /// Display name (may differ from artist.name for collaborations)
    name: String,
}

/// MusicBrainz API client implementing [`CrossRefResolver`]
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Catalog(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: MUSICBRAINZ_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different base URL (tests, mirrors)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_query(title: &str, artist: &str) -> String {
        // Lucene syntax; embedded quotes would terminate the phrase early
        let title = title.replace('"', " ");
        let artist = artist.replace('"', " ");
        format!("recording:\"{}\" AND artist:\"{}\"", title.trim(), artist.trim())
    }

    /// Pick the first recording similar enough to trust, and its first ISRC
    fn select_isrc(response: MBSearchResponse, title: &str, artist: &str) -> Option<String> {
        let wanted_title = title.to_lowercase();
        let wanted_artist = artist.to_lowercase();

        for recording in response.recordings {
            if recording.isrcs.is_empty() {
                continue;
            }
            let Some(credit) = recording.artist_credit.first() else {
                continue;
            };

            let title_sim =
                strsim::jaro_winkler(&wanted_title, recording.title.to_lowercase().trim());
            let artist_sim =
                strsim::jaro_winkler(&wanted_artist, credit.name.to_lowercase().trim());
            if title_sim < ACCEPT_SIMILARITY || artist_sim < ACCEPT_SIMILARITY {
                continue;
            }

            if let Some(isrc) = recording.isrcs.first() {
                return Some(isrc.to_uppercase());
            }
        }
        None
    }
}

#[async_trait]
impl CrossRefResolver for MusicBrainzClient {
    async fn resolve(&self, title: &str, artist: &str) -> Result<Option<String>> {
        if title.trim().is_empty() || artist.trim().is_empty() {
            return Err(SyncError::InvalidInput("Title and artist required".to_string()));
        }

        let query = Self::build_query(title, artist);
        let url = format!("{}/recording", self.base_url);
        let limit = SEARCH_LIMIT.to_string();

        tracing::debug!(title = %title, artist = %artist, query = %query, "Querying MusicBrainz recording search");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("inc", "isrcs"),
                ("fmt", "json"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SyncError::Catalog(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(SyncError::RateLimited { retry_after });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SyncError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SyncError::Catalog(format!("MusicBrainz {}: {}", status.as_u16(), error_text)));
        }

        let search: MBSearchResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))?;

        let isrc = Self::select_isrc(search, title, artist);
        tracing::debug!(title = %title, artist = %artist, isrc = ?isrc, "MusicBrainz resolution complete");

        Ok(isrc)
    }
}
