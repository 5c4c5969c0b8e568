use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Per-credential request quota.
pub struct KeyedRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl KeyedRateLimiter {
    /// `None` when `requests_per_minute` is 0, meaning rate limiting is off.
    pub fn per_minute(requests_per_minute: u32) -> Option<Self> {
        NonZeroU32::new(requests_per_minute).map(|n| Self {
            limiter: RateLimiter::keyed(Quota::per_minute(n)),
        })
    }

    /// Take one unit of `key`'s quota. `false` means the key is over its limit.
    pub fn check(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Forget keys whose quota has fully replenished.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }
}
