//! Fixed-window rate limiting per caller address.
//!
//! # Design Decisions
//! - Fixed window: the counter resets once `window` has elapsed since the
//!   window started. A burst straddling a boundary can admit up to twice the
//!   ceiling; this is accepted behavior
//! - The check is a single read-modify-write under the entry's shard lock,
//!   so concurrent requests from one address never share the last slot
//! - State is in-memory only; idle windows are evicted by a sweeper task

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Per-address counter for the current window.
#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
    last_seen: Instant,
}

impl WindowEntry {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            last_seen: now,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Fixed-window limiter. Owns its window map; share it through an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, WindowEntry>,
    max_requests: u32,
    window: Duration,
    idle_evict: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, idle_evict: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
            idle_evict,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_requests,
            Duration::from_secs(config.window_secs),
            Duration::from_secs(config.idle_evict_secs),
        )
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Admit or reject one request from `key`.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        // The entry guard holds the shard write lock until it drops.
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry::new(now));

        entry.last_seen = now;
        let elapsed = now.saturating_duration_since(entry.window_start);
        if elapsed >= self.window {
            entry.window_start = now;
            entry.count = 0;
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            Decision::Allowed {
                remaining: self.max_requests - entry.count,
            }
        } else {
            let elapsed = now.saturating_duration_since(entry.window_start);
            Decision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        }
    }

    /// Drop windows with no traffic for longer than the idle timeout.
    /// Returns the number of evicted entries.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, entry| now.saturating_duration_since(entry.last_seen) < self.idle_evict);
        let evicted = before.saturating_sub(self.windows.len());
        metrics::record_rate_windows(self.windows.len());
        evicted
    }

    pub fn tracked_addresses(&self) -> usize {
        self.windows.len()
    }

    /// Spawn the periodic eviction task. It exits when `shutdown` fires.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.evict_idle(Instant::now());
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = self.tracked_addresses(), "Evicted idle rate windows");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate window sweeper stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32) -> RateLimiter {
        RateLimiter::new(max, Duration::from_secs(60), Duration::from_secs(300))
    }

    #[test]
    fn test_admits_ceiling_then_limits() {
        let limiter = limiter(100);
        let now = Instant::now();
        for i in 0..100 {
            assert!(limiter.check_at("10.0.0.1", now).is_allowed(), "request {} rejected", i + 1);
        }
        assert!(matches!(limiter.check_at("10.0.0.1", now), Decision::Limited { .. }));
    }

    #[test]
    fn test_addresses_are_independent() {
        let limiter = limiter(1);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn test_window_resets_when_elapsed() {
        let limiter = limiter(2);
        let start = Instant::now();
        assert!(limiter.check_at("a", start).is_allowed());
        assert!(limiter.check_at("a", start).is_allowed());
        assert!(!limiter.check_at("a", start + Duration::from_secs(59)).is_allowed());
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(60)),
            Decision::Allowed { remaining: 1 }
        );
    }

    #[test]
    fn test_boundary_burst_is_tolerated() {
        let limiter = limiter(3);
        let start = Instant::now();
        let mut admitted = 0;
        for _ in 0..3 {
            admitted += limiter.check_at("a", start + Duration::from_secs(59)).is_allowed() as u32;
        }
        // Window started at 59s, so these land in the same window.
        for _ in 0..3 {
            admitted += limiter.check_at("a", start + Duration::from_secs(60)).is_allowed() as u32;
        }
        assert_eq!(admitted, 3);

        // A window started at 0s lets a burst at its end plus one at the next start through.
        let limiter = RateLimiter::new(3, Duration::from_secs(60), Duration::from_secs(300));
        assert!(limiter.check_at("b", start).is_allowed());
        let mut admitted = 1;
        for _ in 0..2 {
            admitted += limiter.check_at("b", start + Duration::from_secs(59)).is_allowed() as u32;
        }
        for _ in 0..3 {
            admitted += limiter.check_at("b", start + Duration::from_secs(60)).is_allowed() as u32;
        }
        assert_eq!(admitted, 6);
    }

    #[test]
    fn test_retry_after_counts_down() {
        let limiter = limiter(1);
        let start = Instant::now();
        limiter.check_at("a", start);
        assert_eq!(
            limiter.check_at("a", start + Duration::from_secs(20)),
            Decision::Limited { retry_after: Duration::from_secs(40) }
        );
    }

    #[test]
    fn test_evict_idle() {
        let limiter = limiter(5);
        let start = Instant::now();
        limiter.check_at("old", start);
        limiter.check_at("fresh", start + Duration::from_secs(250));
        assert_eq!(limiter.evict_idle(start + Duration::from_secs(301)), 1);
        assert_eq!(limiter.tracked_addresses(), 1);
    }

    #[test]
    fn test_concurrent_requests_never_exceed_ceiling() {
        let limiter = Arc::new(limiter(50));
        let now = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..25).filter(|_| limiter.check_at("shared", now).is_allowed()).count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let limiter = Arc::new(limiter(1));
        let (tx, rx) = broadcast::channel(1);
        let handle = limiter.clone().spawn_sweeper(Duration::from_millis(10), rx);
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
