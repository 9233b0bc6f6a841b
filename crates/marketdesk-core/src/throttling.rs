use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::provider_policy::ProviderPolicy;
use crate::ProviderId;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Non-blocking local request budget for one provider.
///
/// An exhausted budget is reported as a rate limit without contacting upstream; nothing is
/// queued or retried.
#[derive(Clone)]
pub struct QuotaGuard {
    provider: ProviderId,
    limiter: Arc<DirectRateLimiter>,
}

impl QuotaGuard {
    pub fn new(provider: ProviderId, quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            provider,
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                quota_window,
                quota_limit,
            ))),
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(policy.provider_id, policy.quota_window, policy.quota_limit)
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// Consumes one unit of budget, returning `false` when none is left.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let burst = NonZeroU32::new(quota_limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
