use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default minimum interval between two fetches of the same host (milliseconds)
pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 200;

/// Default capacity of the host throttle cache
pub const DEFAULT_MAXIMUM_HOST_ENTRIES: usize = 10_000;

/// Default idle time after which a host entry is ignored (milliseconds)
pub const DEFAULT_ENTRY_EXPIRY_MS: u64 = 10 * 60 * 1000;

/// Main configuration structure for Crawl-Admission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Host throttle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Minimum time between two fetches of the same host (milliseconds)
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Maximum number of hosts tracked at once
    #[serde(rename = "maximum-host-entries", default = "default_maximum_host_entries")]
    pub maximum_host_entries: usize,

    /// Idle time after which a host entry is treated as absent (milliseconds)
    #[serde(rename = "entry-expiry", default = "default_entry_expiry")]
    pub entry_expiry: u64,
}

impl PolitenessConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }

    pub fn entry_expiry(&self) -> Duration {
        Duration::from_millis(self.entry_expiry)
    }
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_POLITENESS_DELAY_MS,
            maximum_host_entries: DEFAULT_MAXIMUM_HOST_ENTRIES,
            entry_expiry: DEFAULT_ENTRY_EXPIRY_MS,
        }
    }
}

/// Document identity storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the identity database
    #[serde(default = "default_location")]
    pub location: PathBuf,

    /// Whether identities must survive a crash and be reused by the next run
    #[serde(rename = "resumable-crawling", default)]
    pub resumable_crawling: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            resumable_crawling: false,
        }
    }
}

fn default_delay() -> u64 {
    DEFAULT_POLITENESS_DELAY_MS
}

fn default_maximum_host_entries() -> usize {
    DEFAULT_MAXIMUM_HOST_ENTRIES
}

fn default_entry_expiry() -> u64 {
    DEFAULT_ENTRY_EXPIRY_MS
}

fn default_location() -> PathBuf {
    PathBuf::from("./crawl-storage")
}
