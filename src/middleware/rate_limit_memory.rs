// In-process limiter: governor keyed quotas for requests, a failure ledger for wrong codes

use super::rate_limit::{RateLimitConfig, RateLimiter};
use crate::lifecycle::{Clock, SystemClock};
use async_trait::async_trait;
use governor::clock::{Clock as _, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

const SWEEP_INTERVAL_MS: i64 = 60_000;

/// Wrong codes counted against one key
#[derive(Debug, Clone)]
struct FailureWindow {
    count: u32,
    started_at_ms: i64,
    blocked_until_ms: Option<i64>,
}

impl FailureWindow {
    fn remaining_block_ms(&self, now_ms: i64) -> Option<i64> {
        self.blocked_until_ms
            .map(|until| until - now_ms)
            .filter(|remaining| *remaining > 0)
    }

    fn is_stale(&self, now_ms: i64, window_ms: i64) -> bool {
        self.remaining_block_ms(now_ms).is_none() && now_ms - self.started_at_ms >= window_ms
    }
}

fn millis_to_retry_secs(millis: i64) -> u64 {
    u64::try_from((millis + 999) / 1000).unwrap_or(0).max(1)
}

fn request_quota(config: &RateLimitConfig) -> Quota {
    let burst = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
    let refill_one = Duration::from_secs(config.window_secs.max(1)) / burst.get();

    Quota::with_period(refill_one)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

pub struct MemoryRateLimiter {
    requests: DefaultKeyedRateLimiter<String>,
    quota_clock: DefaultClock,
    failures: RwLock<HashMap<String, FailureWindow>>,
    clock: Arc<dyn Clock>,
    max_failed_attempts: u32,
    block_duration_ms: i64,
    last_sweep_ms: AtomicI64,
}

impl MemoryRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Failure windows and blocks are timed by `clock`
    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_millis();
        let block_duration_ms =
            i64::try_from(config.block_duration_secs.saturating_mul(1000)).unwrap_or(i64::MAX);

        Self {
            requests: governor::RateLimiter::keyed(request_quota(config)),
            quota_clock: DefaultClock::default(),
            failures: RwLock::new(HashMap::new()),
            clock,
            max_failed_attempts: config.max_failed_attempts.max(1),
            block_duration_ms,
            last_sweep_ms: AtomicI64::new(now),
        }
    }

    /// Drop idle quota state and expired failure windows, at most once a minute
    async fn sweep_if_due(&self) {
        let now = self.clock.now_millis();
        let last = self.last_sweep_ms.load(Ordering::SeqCst);
        if now - last < SWEEP_INTERVAL_MS {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        self.requests.retain_recent();

        let mut failures = self.failures.write().await;
        let before = failures.len();
        failures.retain(|_, window| !window.is_stale(now, self.block_duration_ms));
        debug!(
            "Rate limiter sweep: {} failure windows evicted, {} quota keys kept",
            before - failures.len(),
            self.requests.len()
        );
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check_request(&self, key: &str) -> Result<(), u64> {
        self.sweep_if_due().await;

        self.requests.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.quota_clock.now());
            (wait.as_secs_f64().ceil() as u64).max(1)
        })
    }

    async fn blocked_for(&self, keys: &[&str]) -> Result<Option<u64>, String> {
        let now = self.clock.now_millis();
        let failures = self.failures.read().await;

        let remaining = keys
            .iter()
            .filter_map(|key| failures.get(*key))
            .filter_map(|window| window.remaining_block_ms(now))
            .max();

        Ok(remaining.map(millis_to_retry_secs))
    }

    async fn record_failed_verify(&self, keys: &[&str]) -> Result<Option<u64>, String> {
        self.sweep_if_due().await;

        let now = self.clock.now_millis();
        let mut failures = self.failures.write().await;
        let mut longest: Option<i64> = None;

        for key in keys {
            let window = failures
                .entry(key.to_string())
                .or_insert_with(|| FailureWindow {
                    count: 0,
                    started_at_ms: now,
                    blocked_until_ms: None,
                });

            if window.is_stale(now, self.block_duration_ms) {
                *window = FailureWindow {
                    count: 0,
                    started_at_ms: now,
                    blocked_until_ms: None,
                };
            }

            window.count += 1;

            if window.count >= self.max_failed_attempts && window.remaining_block_ms(now).is_none() {
                window.blocked_until_ms = Some(now + self.block_duration_ms);
                info!(
                    "Blocking {} for {}s after {} wrong codes",
                    key,
                    self.block_duration_ms / 1000,
                    window.count
                );
            }

            if let Some(remaining) = window.remaining_block_ms(now) {
                longest = Some(longest.map_or(remaining, |l| l.max(remaining)));
            }
        }

        Ok(longest.map(millis_to_retry_secs))
    }

    async fn clear_failures(&self, keys: &[&str]) -> Result<(), String> {
        let mut failures = self.failures.write().await;
        for key in keys {
            failures.remove(*key);
        }
        Ok(())
    }
}
