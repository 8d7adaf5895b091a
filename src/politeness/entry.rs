use std::time::{Duration, Instant};

/// The last observed fetch of one host
///
/// An entry is replaced on every observation of its host, never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleEntry {
    /// Lowercase host this entry throttles
    pub host: String,

    /// When the most recent fetch of this host was granted
    pub last_fetch_at: Instant,
}

impl ThrottleEntry {
    pub fn new(host: String, last_fetch_at: Instant) -> Self {
        Self {
            host,
            last_fetch_at,
        }
    }

    /// Time elapsed since the last fetch, zero if `now` is earlier
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_fetch_at)
    }

    /// Whether this entry has been idle longer than `expiry`
    ///
    /// Every access records a fetch, so the last access and the last fetch
    /// are the same instant.
    pub fn is_expired(&self, expiry: Duration, now: Instant) -> bool {
        self.elapsed(now) > expiry
    }

    /// Calculates the time until the next fetch may be made
    ///
    /// Returns None if a fetch can be made now, or the duration to wait otherwise.
    pub fn time_until_next_fetch(&self, min_delay: Duration, now: Instant) -> Option<Duration> {
        let elapsed = self.elapsed(now);
        if elapsed < min_delay {
            Some(min_delay - elapsed)
        } else {
            None
        }
    }
}
