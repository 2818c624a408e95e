//! Service components of the reconciliation pipeline

pub mod exact_resolver;
pub mod fuzzy_resolver;
pub mod musicbrainz_client;
pub mod orchestrator;
pub mod rate_limiter;

pub use exact_resolver::{ExactMatchResolver, ExactPhaseResult};
pub use fuzzy_resolver::FuzzyMatchResolver;
pub use musicbrainz_client::MusicBrainzClient;
pub use orchestrator::ReconciliationOrchestrator;
pub use rate_limiter::RateLimiter;
