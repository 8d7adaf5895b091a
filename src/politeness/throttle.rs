//! Bounded, time-expiring per-host throttle cache
//!
//! One mutex guards the whole cache. The critical section is a constant-time
//! LRU lookup and insert and never sleeps, which keeps every host's
//! read-check-write linearizable. Unrelated hosts still contend on that one
//! lock; with very large worker counts a hash-partitioned set of caches
//! would be the next step, at the cost of a global LRU order.

use crate::config::PolitenessConfig;
use crate::politeness::ThrottleEntry;
use crate::url::resolve_host;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Computes politeness waits from the last fetch time of each host
///
/// Entries are evicted least-recently-accessed first once
/// `maximum_host_entries` is reached, and an entry idle for longer than
/// `entry_expiry` is treated as absent. Losing an entry only means the next
/// fetch of that host is not delayed.
pub struct HostThrottleCache {
    seen_hosts: Mutex<LruCache<String, ThrottleEntry>>,
    delay: Duration,
    entry_expiry: Duration,
}

impl HostThrottleCache {
    /// Creates a cache from the politeness section of the configuration
    ///
    /// A zero `maximum_host_entries` is raised to one; the config validator
    /// rejects it before it gets here.
    pub fn new(config: &PolitenessConfig) -> Self {
        let capacity = NonZeroUsize::new(config.maximum_host_entries).unwrap_or(NonZeroUsize::MIN);
        Self::with_limits(config.delay(), capacity, config.entry_expiry())
    }

    pub fn with_limits(delay: Duration, maximum_host_entries: NonZeroUsize, entry_expiry: Duration) -> Self {
        Self {
            seen_hosts: Mutex::new(LruCache::new(maximum_host_entries)),
            delay,
            entry_expiry,
        }
    }

    /// Records a fetch of `host` now and returns how long the caller must wait first
    ///
    /// Returns `None` when there is no live entry for the host or the
    /// politeness delay has already passed. The new fetch time is recorded
    /// either way, before the caller actually fetches, so concurrent callers
    /// for one host are spaced out in arrival order.
    pub fn record_and_compute_delay(&self, host: &str) -> Option<Duration> {
        self.record_and_compute_delay_at(host, Instant::now())
    }

    /// Same as [`record_and_compute_delay`](Self::record_and_compute_delay) with an explicit clock reading
    pub fn record_and_compute_delay_at(&self, host: &str, now: Instant) -> Option<Duration> {
        let host = host.trim().to_lowercase();
        if host.is_empty() {
            tracing::error!("Could not determine host: empty host name");
            return None;
        }

        let mut seen_hosts = self.lock_hosts();

        let delay = seen_hosts
            .get(&host)
            .filter(|entry| !entry.is_expired(self.entry_expiry, now))
            .and_then(|entry| entry.time_until_next_fetch(self.delay, now));

        if let Some(delay) = delay {
            tracing::debug!(
                "Applying politeness delay of {} ms for host {}",
                delay.as_millis(),
                host
            );
        }

        evict_expired_tail(&mut seen_hosts, self.entry_expiry, now);
        seen_hosts.put(host.clone(), ThrottleEntry::new(host, now));

        delay
    }

    /// Resolves the host of `url` and records a fetch of it
    ///
    /// A URL whose host cannot be determined is logged and gets no delay;
    /// the cache is left untouched.
    pub fn apply_politeness(&self, url: &str) -> Option<Duration> {
        match resolve_host(url) {
            Ok(host) => self.record_and_compute_delay(&host),
            Err(e) => {
                tracing::error!("{}", e);
                None
            }
        }
    }

    /// Eagerly drops every expired entry
    pub fn force_clean_up(&self) {
        self.force_clean_up_at(Instant::now());
    }

    pub fn force_clean_up_at(&self, now: Instant) {
        let mut seen_hosts = self.lock_hosts();

        let expired: Vec<String> = seen_hosts
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.entry_expiry, now))
            .map(|(host, _)| host.clone())
            .collect();

        for host in &expired {
            seen_hosts.pop(host);
        }

        if !expired.is_empty() {
            tracing::debug!("Removed {} expired host entries", expired.len());
        }
    }

    /// Number of entries held, possibly including expired ones not yet reclaimed
    pub fn size(&self) -> usize {
        self.lock_hosts().len()
    }

    pub fn capacity(&self) -> usize {
        self.lock_hosts().cap().get()
    }

    /// Whether an entry for `host` is physically present; does not touch recency
    pub fn contains(&self, host: &str) -> bool {
        self.lock_hosts().contains(&host.to_lowercase())
    }

    pub fn politeness_delay(&self) -> Duration {
        self.delay
    }

    fn lock_hosts(&self) -> MutexGuard<'_, LruCache<String, ThrottleEntry>> {
        // Entries are plain timestamps, so a panic elsewhere cannot leave them inconsistent.
        self.seen_hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pops expired entries from the least-recently-used end
///
/// Every access rewrites the fetch time, so recency order is also age order
/// and expired entries collect at the tail.
fn evict_expired_tail(seen_hosts: &mut LruCache<String, ThrottleEntry>, expiry: Duration, now: Instant) {
    while seen_hosts
        .peek_lru()
        .is_some_and(|(_, entry)| entry.is_expired(expiry, now))
    {
        seen_hosts.pop_lru();
    }
}
