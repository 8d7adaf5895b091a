//! Crawl-Admission: politeness and document identity for a crawl frontier
//!
//! This crate holds the two pieces of crawl state that every worker shares:
//! a bounded per-host throttle cache that computes politeness waits, and a
//! durable store that assigns each canonical URL a unique document id.

pub mod config;
pub mod frontier;
pub mod politeness;
pub mod storage;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Crawl-Admission operations
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not determine host for {url}: {reason}")]
    HostResolution { url: String, reason: String },

    #[error("Doc id {existing} is already assigned to URL {url} (requested {requested})")]
    Conflict {
        url: String,
        existing: String,
        requested: String,
    },

    #[error("Doc id {doc_id} is already assigned to another URL (requested for {url})")]
    DuplicateDocId { url: String, doc_id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        source: storage::StorageError,
    },

    #[error("Storage error: {0}")]
    StorageIo(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Crawl-Admission operations
pub type Result<T> = std::result::Result<T, FrontierError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use frontier::{DocId, DocumentIdentity, DocumentIdentityStore};
pub use politeness::{HostThrottleCache, ThrottleEntry};
pub use url::{extract_domain, normalize_url, resolve_host, Canonicalizer, UrlCanonicalizer};
