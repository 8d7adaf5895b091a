//! Integration tests for the host throttle cache
//!
//! Deterministic schedules use explicit clock readings; the concurrency
//! tests use real threads and tokio tasks with short delays.

use crawl_admission::config::{parse_config, PolitenessConfig};
use crawl_admission::politeness::{wait_for_host, wait_for_url};
use crawl_admission::HostThrottleCache;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn politeness(delay_ms: u64, maximum_host_entries: usize, entry_expiry_ms: u64) -> PolitenessConfig {
    PolitenessConfig {
        delay: delay_ms,
        maximum_host_entries,
        entry_expiry: entry_expiry_ms,
    }
}

#[test]
fn test_literal_delay_scenario() {
    let cache = HostThrottleCache::new(&politeness(2000, 100, 60_000));
    let t0 = Instant::now();

    assert_eq!(cache.record_and_compute_delay_at("example.com", t0), None);
    assert_eq!(
        cache.record_and_compute_delay_at("example.com", t0 + Duration::from_millis(500)),
        Some(Duration::from_millis(1500))
    );
    assert_eq!(
        cache.record_and_compute_delay_at("example.com", t0 + Duration::from_millis(2500)),
        None
    );
}

#[test]
fn test_real_clock_delay_is_close_to_remaining_interval() {
    let cache = HostThrottleCache::new(&politeness(500, 100, 60_000));

    assert_eq!(cache.record_and_compute_delay("example.com"), None);
    thread::sleep(Duration::from_millis(100));

    let delay = cache
        .record_and_compute_delay("example.com")
        .expect("second fetch inside the interval must wait");
    assert!(delay <= Duration::from_millis(400));
    assert!(delay >= Duration::from_millis(200));
}

#[test]
fn test_capacity_invariant() {
    let capacity = 50;
    let cache = HostThrottleCache::new(&politeness(1000, capacity, 60_000));
    let t0 = Instant::now();

    for i in 0..=capacity {
        cache.record_and_compute_delay_at(&format!("host{}.com", i), t0 + Duration::from_millis(i as u64));
        assert!(cache.size() <= capacity);
    }

    assert_eq!(cache.size(), capacity);
    assert!(!cache.contains("host0.com"));
    assert!(cache.contains(&format!("host{}.com", capacity)));
}

#[test]
fn test_expired_entry_still_present_until_cleanup() {
    let cache = HostThrottleCache::new(&politeness(5000, 100, 1000));
    let t0 = Instant::now();

    cache.record_and_compute_delay_at("idle.com", t0);
    cache.record_and_compute_delay_at("busy.com", t0 + Duration::from_millis(900));

    // Nothing has been written since idle.com expired, so it is still held.
    assert_eq!(cache.size(), 2);

    cache.force_clean_up_at(t0 + Duration::from_millis(1500));
    assert_eq!(cache.size(), 1);
    assert_eq!(
        cache.record_and_compute_delay_at("idle.com", t0 + Duration::from_millis(1600)),
        None
    );
}

#[test]
fn test_concurrent_callers_for_one_host_get_one_free_pass() {
    let cache = Arc::new(HostThrottleCache::new(&politeness(10_000, 100, 60_000)));
    let workers = 12;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.record_and_compute_delay("shared.com")
            })
        })
        .collect();

    let free = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(Option::is_none)
        .count();

    assert_eq!(free, 1);
    assert_eq!(cache.size(), 1);
}

#[test]
fn test_malformed_urls_do_not_block_other_hosts() {
    let cache = HostThrottleCache::new(&politeness(1000, 100, 60_000));

    for _ in 0..5 {
        assert_eq!(cache.apply_politeness("http://"), None);
    }
    assert_eq!(cache.apply_politeness("http://good.com/"), None);
    assert_eq!(cache.size(), 1);
}

#[test]
fn test_cache_from_parsed_config() {
    let config = parse_config(
        r#"
[politeness]
delay = 1500
maximum-host-entries = 3
"#,
    )
    .unwrap();
    let cache = HostThrottleCache::new(&config.politeness);

    assert_eq!(cache.capacity(), 3);
    assert_eq!(cache.politeness_delay(), Duration::from_millis(1500));
}

#[tokio::test]
async fn test_waiting_on_one_host_does_not_hold_up_another() {
    let cache = Arc::new(HostThrottleCache::new(&politeness(1000, 100, 60_000)));
    cache.record_and_compute_delay("slow.com");

    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { wait_for_host(&cache, "slow.com").await })
    };
    tokio::task::yield_now().await;

    let start = Instant::now();
    let waited = wait_for_url(&cache, "https://fast.com/index.html").await;
    assert_eq!(waited, Duration::ZERO);
    assert!(start.elapsed() < Duration::from_millis(500));

    let slow_wait = waiter.await.unwrap();
    assert!(slow_wait > Duration::ZERO);
}
