//! URL normalization helpers
//!
//! Submitted URLs frequently arrive without a scheme (`example.com`).
//! Normalization defaults the scheme to `https://`, validates the result,
//! and rejects non-HTTP(S) schemes before anything is queued for fetching.

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// Extracts the hostname from a URL, if present
///
/// Link classification compares hostnames as exact strings, so this is
/// the single place that decides what "hostname" means for Pagelens.
pub fn host_of(url: &Url) -> Option<&str> {
    url.host_str()
}
