//! # Rate Limiter Module
//!
//! Per-user command throttling, applied before the authorization check so
//! that unauthorized senders are throttled too.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};

/// Commands allowed per window
pub const DEFAULT_COMMAND_LIMIT: u32 = 10;
/// Window length in seconds
pub const DEFAULT_WINDOW_SECS: u64 = 30;

/// Keyed limiter allowing at most `limit` commands per `window` for every user.
///
/// A user may spend the whole allowance at once; after that one command is
/// regained per full `window`.
pub struct UserRateLimiter<C: Clock = DefaultClock> {
    limiter: RateLimiter<u64, DashMapStateStore<u64>, C, NoOpMiddleware<C::Instant>>,
    limit: u32,
    window: Duration,
}

fn quota(limit: u32, window: Duration) -> Result<Quota> {
    let burst = NonZeroU32::new(limit).with_context(|| anyhow!("rate limit is zero"))?;
    let quota = Quota::with_period(window)
        .with_context(|| anyhow!("rate limit window is zero"))?
        .allow_burst(burst);
    Ok(quota)
}

impl UserRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        Self::with_clock(limit, window, DefaultClock::default())
    }
}

impl<C: Clock> UserRateLimiter<C> {
    pub fn with_clock(limit: u32, window: Duration, clock: C) -> Result<Self> {
        Ok(Self {
            limiter: RateLimiter::dashmap_with_clock(quota(limit, window)?, clock),
            limit,
            window,
        })
    }

    /// Returns `true` when the user may run another command now
    pub fn check(&self, user_id: u64) -> bool {
        self.limiter.check_key(&user_id).is_ok()
    }

    /// Drop state for users whose allowance is fully restored
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for UserRateLimiter {
    fn default() -> Self {
        let window = Duration::from_secs(DEFAULT_WINDOW_SECS);
        let burst = NonZeroU32::new(DEFAULT_COMMAND_LIMIT).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window)
            .unwrap_or_else(|| Quota::per_minute(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::dashmap_with_clock(quota, DefaultClock::default()),
            limit: burst.get(),
            window,
        }
    }
}
