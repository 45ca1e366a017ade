//! Rate limiting for outbound backend calls
//!
//! Two layers are combined per key:
//! - a concurrency ceiling (a `tokio::sync::Semaphore`)
//! - a sliding-window call quota (`SlidingWindow`)
//!
//! Keys are provider ids, model names or a single global key depending on
//! [`RateLimitScope`]. Callers block in [`ProviderRateLimiter::acquire`] until
//! both layers admit them, the cancellation token fires, or the policy's
//! acquire timeout elapses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, RwLock, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Key used when every call shares one bucket
pub const GLOBAL_KEY: &str = "global";

/// Shortest sleep between quota re-checks
const MIN_QUOTA_WAIT: Duration = Duration::from_millis(1);

// ============================================================================
// Sliding window
// ============================================================================

/// Sliding window quota configuration
#[derive(Debug, Clone)]
pub struct WindowConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl WindowConfig {
    /// Create a new window config
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Requests per second
    #[must_use]
    pub fn per_second(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    /// Requests per minute
    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

/// Result of a quota check
#[derive(Debug, Clone)]
pub struct WindowCheck {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Time until the oldest request leaves the window
    pub reset_after: Duration,
    /// Request count including this one if allowed
    pub current: u32,
}

/// Sliding-window call log keyed by string
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    config: WindowConfig,
    requests: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
}

impl SlidingWindow {
    /// Create a new sliding window
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Window configuration
    #[must_use]
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Check whether a request would be admitted, without recording it
    pub async fn check(&self, key: &str) -> WindowCheck {
        let now = Instant::now();
        let requests = self.requests.read().await;
        self.evaluate(requests.get(key).map(Vec::as_slice), now)
    }

    /// Record a request
    pub async fn record(&self, key: &str) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let records = requests.entry(key.to_string()).or_default();
        self.prune(records, now);
        records.push(now);
    }

    /// Check and record under one lock
    pub async fn acquire(&self, key: &str) -> WindowCheck {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let records = requests.entry(key.to_string()).or_default();
        self.prune(records, now);

        let result = self.evaluate(Some(records.as_slice()), now);
        if result.allowed {
            records.push(now);
        }
        result
    }

    /// Current usage as `(in_window, max)`
    pub async fn usage(&self, key: &str) -> (u32, u32) {
        let now = Instant::now();
        let requests = self.requests.read().await;
        let current = requests
            .get(key)
            .map_or(0, |records| self.count_in_window(records, now));
        (current, self.config.max_requests)
    }

    /// Forget every request recorded for a key
    pub async fn reset(&self, key: &str) {
        self.requests.write().await.remove(key);
    }

    /// Drop expired records; returns the number of keys removed
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let before = requests.len();
        requests.retain(|_, records| {
            self.prune(records, now);
            !records.is_empty()
        });
        before - requests.len()
    }

    fn window_start(&self, now: Instant) -> Option<Instant> {
        now.checked_sub(self.config.window)
    }

    fn prune(&self, records: &mut Vec<Instant>, now: Instant) {
        if let Some(start) = self.window_start(now) {
            records.retain(|t| *t > start);
        }
    }

    fn count_in_window(&self, records: &[Instant], now: Instant) -> u32 {
        match self.window_start(now) {
            Some(start) => records.iter().filter(|t| **t > start).count() as u32,
            None => records.len() as u32,
        }
    }

    fn evaluate(&self, records: Option<&[Instant]>, now: Instant) -> WindowCheck {
        let records = records.unwrap_or(&[]);
        let current = self.count_in_window(records, now);
        let reset_after = self.reset_after(records, now);

        if current < self.config.max_requests {
            WindowCheck {
                allowed: true,
                remaining: self.config.max_requests - current - 1,
                reset_after,
                current: current + 1,
            }
        } else {
            WindowCheck {
                allowed: false,
                remaining: 0,
                reset_after,
                current: current.min(self.config.max_requests),
            }
        }
    }

    fn reset_after(&self, records: &[Instant], now: Instant) -> Duration {
        let start = self.window_start(now);
        records
            .iter()
            .filter(|t| start.map_or(true, |s| **t > s))
            .min()
            .map_or(Duration::ZERO, |oldest| {
                self.config
                    .window
                    .saturating_sub(now.duration_since(*oldest))
            })
    }
}

// ============================================================================
// Policy
// ============================================================================

/// How calls are grouped into rate-limit buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    /// One bucket per provider id
    #[default]
    Provider,
    /// One bucket per model name, using its provider's policy
    Model,
    /// One bucket for everything, using the default policy
    Global,
}

/// Limits applied to one bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePolicy {
    /// Maximum in-flight calls (0 = unlimited)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Maximum calls per window (0 = unlimited)
    #[serde(default)]
    pub max_requests: u32,
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Give up waiting after this many milliseconds (0 = wait until cancelled)
    #[serde(default)]
    pub acquire_timeout_ms: u64,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_window_ms() -> u64 {
    60_000
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_requests: 0,
            window_ms: default_window_ms(),
            acquire_timeout_ms: 0,
        }
    }
}

impl RatePolicy {
    /// No limits at all
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_concurrent: 0,
            ..Self::default()
        }
    }

    /// Set the concurrency ceiling
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the per-window quota
    #[must_use]
    pub fn with_quota(mut self, max_requests: u32, window: Duration) -> Self {
        self.max_requests = max_requests;
        self.window_ms = super::duration_millis(window).max(1);
        self
    }

    /// Set the acquire timeout
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = super::duration_millis(timeout);
        self
    }

    /// Acquire timeout, if any
    #[must_use]
    pub fn acquire_timeout(&self) -> Option<Duration> {
        (self.acquire_timeout_ms > 0).then(|| Duration::from_millis(self.acquire_timeout_ms))
    }

    fn window_config(&self) -> Option<WindowConfig> {
        (self.max_requests > 0)
            .then(|| WindowConfig::new(self.max_requests, Duration::from_millis(self.window_ms.max(1))))
    }
}

/// Rate limit configuration: scope, fallback policy and per-provider policies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Bucket grouping
    #[serde(default)]
    pub scope: RateLimitScope,
    /// Policy for providers without an explicit entry
    #[serde(default)]
    pub default: RatePolicy,
    /// Per-provider policies
    #[serde(default)]
    pub providers: HashMap<String, RatePolicy>,
}

impl RateLimitSettings {
    /// Settings with one policy for everything
    #[must_use]
    pub fn new(scope: RateLimitScope, default: RatePolicy) -> Self {
        Self {
            scope,
            default,
            providers: HashMap::new(),
        }
    }

    /// Add a provider policy
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>, policy: RatePolicy) -> Self {
        self.providers.insert(provider.into(), policy);
        self
    }

    fn policy_for(&self, provider: &str) -> &RatePolicy {
        match self.scope {
            RateLimitScope::Global => &self.default,
            RateLimitScope::Provider | RateLimitScope::Model => {
                self.providers.get(provider).unwrap_or(&self.default)
            }
        }
    }

    fn key_for(&self, provider: &str, model: &str) -> String {
        match self.scope {
            RateLimitScope::Provider => provider.to_string(),
            RateLimitScope::Model => model.to_string(),
            RateLimitScope::Global => GLOBAL_KEY.to_string(),
        }
    }
}

// ============================================================================
// Limiter
// ============================================================================

/// Rate limiter errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// The caller's token was cancelled while waiting
    #[error("cancelled while waiting for rate limit slot on '{0}'")]
    Cancelled(String),

    /// The policy's acquire timeout elapsed
    #[error("timed out after {waited:?} waiting for rate limit slot on '{key}'")]
    Timeout {
        /// Bucket key
        key: String,
        /// Time spent waiting
        waited: Duration,
    },
}

/// Admission to one backend call; dropping it frees the concurrency slot
#[derive(Debug)]
pub struct RatePermit {
    key: String,
    waited: Duration,
    _slot: Option<OwnedSemaphorePermit>,
}

impl RatePermit {
    /// Bucket key this permit belongs to
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Time spent waiting for admission
    #[must_use]
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

#[derive(Debug)]
struct Bucket {
    key: String,
    policy: RatePolicy,
    slots: Option<Arc<Semaphore>>,
    window: Option<SlidingWindow>,
}

impl Bucket {
    fn new(key: String, policy: RatePolicy) -> Self {
        let slots = (policy.max_concurrent > 0).then(|| Arc::new(Semaphore::new(policy.max_concurrent)));
        let window = policy.window_config().map(SlidingWindow::new);
        Self {
            key,
            policy,
            slots,
            window,
        }
    }

    async fn admit(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<OwnedSemaphorePermit>, RateLimitError> {
        let slot = match &self.slots {
            Some(slots) => {
                let slots = Arc::clone(slots);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(RateLimitError::Cancelled(self.key.clone()));
                    }
                    permit = slots.acquire_owned() => permit.ok(),
                }
            }
            None => None,
        };

        if let Some(window) = &self.window {
            loop {
                let check = window.acquire(&self.key).await;
                if check.allowed {
                    break;
                }
                let wait = check.reset_after.max(MIN_QUOTA_WAIT);
                debug!(
                    key = %self.key,
                    current = check.current,
                    wait_ms = wait.as_millis() as u64,
                    "call quota exhausted, waiting"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(RateLimitError::Cancelled(self.key.clone()));
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }

        Ok(slot)
    }
}

/// Process-wide limiter shared by every model processor
#[derive(Debug)]
pub struct ProviderRateLimiter {
    settings: RateLimitSettings,
    buckets: Mutex<HashMap<String, Arc<Bucket>>>,
}

impl ProviderRateLimiter {
    /// Create a limiter
    #[must_use]
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// A limiter that admits everything immediately
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(RateLimitSettings::new(
            RateLimitScope::Global,
            RatePolicy::unlimited(),
        ))
    }

    /// Settings this limiter was built with
    #[must_use]
    pub fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    fn bucket(&self, provider: &str, model: &str) -> Arc<Bucket> {
        let key = self.settings.key_for(provider, model);
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = buckets.entry(key.clone()).or_insert_with(|| {
            Arc::new(Bucket::new(key, self.settings.policy_for(provider).clone()))
        });
        Arc::clone(bucket)
    }

    /// Wait for admission to call `model` on `provider`
    ///
    /// # Errors
    /// `Cancelled` if `cancel` fires first, `Timeout` if the bucket policy's
    /// acquire timeout elapses first.
    #[instrument(skip(self, cancel))]
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
        provider: &str,
        model: &str,
    ) -> Result<RatePermit, RateLimitError> {
        let bucket = self.bucket(provider, model);
        let started = Instant::now();

        let slot = match bucket.policy.acquire_timeout() {
            Some(limit) => tokio::time::timeout(limit, bucket.admit(cancel))
                .await
                .map_err(|_| RateLimitError::Timeout {
                    key: bucket.key.clone(),
                    waited: started.elapsed(),
                })??,
            None => bucket.admit(cancel).await?,
        };

        let waited = started.elapsed();
        if !waited.is_zero() {
            debug!(key = %bucket.key, waited_ms = waited.as_millis() as u64, "rate limit slot acquired");
        }

        Ok(RatePermit {
            key: bucket.key.clone(),
            waited,
            _slot: slot,
        })
    }

    /// Free concurrency slots for a bucket, `None` if it has no ceiling or
    /// has not been used yet
    #[must_use]
    pub fn available_slots(&self, key: &str) -> Option<usize> {
        let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        buckets
            .get(key)
            .and_then(|b| b.slots.as_ref())
            .map(|s| s.available_permits())
    }

    /// Sliding-window usage for a bucket as `(in_window, max)`
    pub async fn usage(&self, key: &str) -> Option<(u32, u32)> {
        let bucket = {
            let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
            buckets.get(key).cloned()
        }?;
        match &bucket.window {
            Some(window) => Some(window.usage(key).await),
            None => None,
        }
    }

    /// Drop expired window records across all buckets
    pub async fn cleanup(&self) -> usize {
        let buckets: Vec<Arc<Bucket>> = {
            let buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
            buckets.values().cloned().collect()
        };
        let mut removed = 0;
        for bucket in buckets {
            if let Some(window) = &bucket.window {
                removed += window.cleanup().await;
            }
        }
        removed
    }
}

impl Default for ProviderRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitSettings::default())
    }
}
