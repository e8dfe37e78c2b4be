//! Send pacing for outbound mail
//!
//! A fixed pause of `60 / rate_per_minute` seconds follows every successful
//! live send. There is no burst allowance and the time spent inside the
//! send call is not subtracted from the pause.
//!
//! # Example
//! ```no_run
//! use mail_dispatch::security::Pacer;
//!
//! # async fn example() {
//! let pacer = Pacer::per_minute(Some(30.0));
//! assert_eq!(pacer.delay().map(|d| d.as_secs()), Some(2));
//! pacer.pause().await;
//! # }
//! ```

use std::time::Duration;
use tracing::debug;

/// Fixed-delay pacer between sends
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pacer {
    delay: Option<Duration>,
}

impl Pacer {
    /// Pacer for at most `rate` sends per minute.
    ///
    /// `None`, zero, negative and non-finite rates disable pacing. A rate
    /// so small that its delay cannot be represented also disables it;
    /// use [`Pacer::try_per_minute`] to reject such rates instead.
    pub fn per_minute(rate: Option<f64>) -> Self {
        Self::try_per_minute(rate).unwrap_or_default()
    }

    /// Like [`Pacer::per_minute`], but fails on a positive rate whose
    /// delay overflows [`Duration`].
    pub fn try_per_minute(rate: Option<f64>) -> Result<Self, String> {
        let Some(rate) = rate.filter(|r| r.is_finite() && *r > 0.0) else {
            return Ok(Self::disabled());
        };
        let delay = Duration::try_from_secs_f64(60.0 / rate)
            .map_err(|e| format!("rate-per-minute {} is too small: {}", rate, e))?;
        Ok(Self { delay: Some(delay) })
    }

    /// Pacer that never waits
    pub fn disabled() -> Self {
        Self { delay: None }
    }

    /// Pause inserted after each successful send, if any
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn is_enabled(&self) -> bool {
        self.delay.is_some()
    }

    /// Sleep for the configured delay; returns immediately when disabled.
    pub async fn pause(&self) {
        if let Some(delay) = self.delay {
            debug!("Rate limit: sleeping {:.3}s", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}
