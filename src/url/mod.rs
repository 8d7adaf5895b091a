//! URL handling module for Crawl-Admission
//!
//! Canonicalization and host extraction are the two places where raw URLs
//! enter this crate. The identity store only ever sees canonical strings;
//! the throttle cache only ever sees lowercase hosts.

mod domain;
mod normalize;

use crate::UrlResult;

// Re-export main functions
pub use domain::{extract_domain, resolve_host};
pub use normalize::normalize_url;

/// Turns a raw URL into the canonical string used as a document identity key
///
/// Canonicalization is owned by the crawl pipeline; the identity store only
/// needs it for [`is_seen_before`](crate::DocumentIdentityStore::is_seen_before).
pub trait Canonicalizer: Send + Sync {
    fn canonicalize(&self, url: &str) -> UrlResult<String>;
}

/// Default canonicalizer built on [`normalize_url`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlCanonicalizer;

impl Canonicalizer for UrlCanonicalizer {
    fn canonicalize(&self, url: &str) -> UrlResult<String> {
        normalize_url(url).map(String::from)
    }
}
