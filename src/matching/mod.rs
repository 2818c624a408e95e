//! Normalization and similarity scoring
//!
//! The pure-text half of the reconciliation engine: no I/O, no catalog
//! access, deterministic and synchronous.

pub mod normalize;
pub mod similarity;

pub use normalize::{extract_primary_title, normalize_artist, normalize_for_comparison, strip_version_suffix};
pub use similarity::{artist_similarity, calculate_similarity, duration_multiplier, title_similarity, MatchTuning};
