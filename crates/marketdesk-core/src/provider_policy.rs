use std::time::Duration;

use crate::ProviderId;

/// Local request budget kept per provider so a burst never burns the upstream quota.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    pub quota_window: Duration,
    pub quota_limit: u32,
}

impl ProviderPolicy {
    pub fn alphavantage_default() -> Self {
        Self {
            provider_id: ProviderId::Alphavantage,
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
        }
    }

    pub fn polygon_default() -> Self {
        Self {
            provider_id: ProviderId::Polygon,
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
        }
    }

    pub fn yahoo_default() -> Self {
        Self {
            provider_id: ProviderId::Yahoo,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
        }
    }

    pub fn fred_default() -> Self {
        Self {
            provider_id: ProviderId::Fred,
            quota_window: Duration::from_secs(60),
            quota_limit: 120,
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Alphavantage => Self::alphavantage_default(),
            ProviderId::Polygon => Self::polygon_default(),
            ProviderId::Yahoo => Self::yahoo_default(),
            ProviderId::Fred => Self::fred_default(),
        }
    }
}
