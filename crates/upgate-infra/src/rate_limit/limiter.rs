use std::sync::Arc;
use std::time::Duration;

use crate::store::{EphemeralStore, StoreResult};

/// Outcome of consulting the limiter for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Exceeded { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Fixed-window upload limiter backed by the keyed ephemeral store.
///
/// Each identity owns a counter under `upload_rate_{identity}` whose TTL is
/// the window length, anchored at the first recorded attempt. With a quota of
/// one this is a plain "marker present" check.
#[derive(Clone)]
pub struct UploadRateLimiter {
    store: Arc<dyn EphemeralStore>,
    window: Duration,
    quota: u32,
}

impl UploadRateLimiter {
    pub fn new(store: Arc<dyn EphemeralStore>, window: Duration, quota: u32) -> Self {
        Self {
            store,
            window,
            quota: quota.max(1),
        }
    }

    fn key(identity: &str) -> String {
        format!("upload_rate_{}", identity)
    }

    /// Consume one slot for `identity` and report whether it was within quota.
    ///
    /// Attempts beyond the quota still count; the window is never extended.
    #[tracing::instrument(skip(self))]
    pub async fn check_and_record(&self, identity: &str) -> StoreResult<RateLimitDecision> {
        let key = Self::key(identity);
        let count = self.store.increment(&key, self.window).await?;

        if count > u64::from(self.quota) {
            let retry_after = self.retry_after(identity).await?;
            tracing::debug!(
                identity = %identity,
                count = count,
                retry_after_secs = retry_after.as_secs(),
                "Upload rate limit reached"
            );
            return Ok(RateLimitDecision::Exceeded { retry_after });
        }

        let remaining = u32::try_from(u64::from(self.quota) - count).unwrap_or(0);
        Ok(RateLimitDecision::Allowed { remaining })
    }

    /// Report whether `identity` has a free slot without consuming it.
    pub async fn check(&self, identity: &str) -> StoreResult<RateLimitDecision> {
        let used = self
            .store
            .get(&Self::key(identity))
            .await?
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);

        if used >= u64::from(self.quota) {
            let retry_after = self.retry_after(identity).await?;
            return Ok(RateLimitDecision::Exceeded { retry_after });
        }

        let remaining = u32::try_from(u64::from(self.quota) - used).unwrap_or(0);
        Ok(RateLimitDecision::Allowed { remaining })
    }

    /// Consume one slot for `identity` unconditionally.
    pub async fn record(&self, identity: &str) -> StoreResult<()> {
        self.store.increment(&Self::key(identity), self.window).await?;
        Ok(())
    }

    /// Time until the identity's window closes. Zero when no window is open.
    pub async fn retry_after(&self, identity: &str) -> StoreResult<Duration> {
        Ok(self
            .store
            .ttl_remaining(&Self::key(identity))
            .await?
            .unwrap_or(Duration::ZERO))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }
}
