//! Politeness module for spacing out fetches of the same host
//!
//! # Components
//!
//! - `ThrottleEntry`: the last fetch time of one host
//! - `HostThrottleCache`: bounded, expiring map from host to `ThrottleEntry`

mod entry;
mod throttle;

pub use entry::ThrottleEntry;
pub use throttle::HostThrottleCache;

use std::time::Duration;

/// Waits until `host` may be fetched, then returns the time waited
///
/// The delay is computed and recorded under the cache lock; the sleep happens
/// after the lock is released so other hosts are never held up.
pub async fn wait_for_host(cache: &HostThrottleCache, host: &str) -> Duration {
    let delay = cache.record_and_compute_delay(host);
    sleep_for(delay).await
}

/// Waits until the host of `url` may be fetched, then returns the time waited
///
/// A URL without a resolvable host is not delayed.
pub async fn wait_for_url(cache: &HostThrottleCache, url: &str) -> Duration {
    let delay = cache.apply_politeness(url);
    sleep_for(delay).await
}

async fn sleep_for(delay: Option<Duration>) -> Duration {
    match delay {
        Some(delay) => {
            tokio::time::sleep(delay).await;
            delay
        }
        None => Duration::ZERO,
    }
}
