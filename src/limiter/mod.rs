//! Per-client sliding-window admission.
//!
//! Every client identity gets two windows, one minute and one hour. A
//! request is admitted only while both are under their thresholds, and
//! only admitted requests are counted.
//!
//! [`RateLimiter`] consults a primary [`WindowCounter`] (Redis, shared
//! across instances) when one is configured and falls through to its own
//! in-process [`MemoryWindow`] whenever the primary errors. A limiter
//! outage never fails a request.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryWindow;
#[cfg(feature = "redis")]
pub use self::redis::RedisWindow;

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::telemetry;
use crate::{Result, SouschefError};

pub const MINUTE: Duration = Duration::from_secs(60);
pub const HOUR: Duration = Duration::from_secs(3600);

/// Admission thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub per_minute: u32,
    pub per_hour: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_minute: 60,
            per_hour: 1000,
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Who a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Identity derived from an API key. Only a short prefix is kept.
    pub fn api_key(key: &str) -> Self {
        let prefix: String = key.chars().take(8).collect();
        Self(format!("key:{prefix}"))
    }

    /// Identity derived from the peer address.
    pub fn ip(addr: Option<IpAddr>) -> Self {
        match addr {
            Some(addr) => Self(format!("ip:{addr}")),
            None => Self("ip:unknown".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A window store that checks and records in one step.
///
/// A rejected request must leave the counts untouched.
#[async_trait]
pub trait WindowCounter: Send + Sync {
    fn name(&self) -> &str;

    async fn admit(&self, identity: &ClientIdentity, limits: RateLimits) -> Result<Decision>;
}

/// Rate limiter with a distributed primary and an in-memory fallback.
pub struct RateLimiter {
    limits: RateLimits,
    enabled: bool,
    primary: Option<Arc<dyn WindowCounter>>,
    fallback: MemoryWindow,
}

impl RateLimiter {
    /// In-process limiter only.
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            enabled: true,
            primary: None,
            fallback: MemoryWindow::new(),
        }
    }

    /// Limiter that admits everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(RateLimits::default())
        }
    }

    /// Consult `primary` first, falling back to memory when it errors.
    pub fn with_primary(mut self, primary: Arc<dyn WindowCounter>) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check and, if admitted, record one request for `identity`.
    pub async fn admit(&self, identity: &ClientIdentity) -> Decision {
        if !self.enabled {
            return Decision::Allow;
        }

        let decision = match &self.primary {
            Some(primary) => match primary.admit(identity, self.limits).await {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(
                        identity = %identity,
                        backend = primary.name(),
                        error = %e,
                        "rate limit backend failed, using in-memory window"
                    );
                    metrics::counter!(telemetry::RATE_LIMIT_FALLBACKS_TOTAL).increment(1);
                    self.fallback.admit_now(identity, self.limits)
                }
            },
            None => self.fallback.admit_now(identity, self.limits),
        };

        if !decision.is_allowed() {
            metrics::counter!(telemetry::RATE_LIMIT_REJECTIONS_TOTAL).increment(1);
        }
        decision
    }

    /// Like [`admit`](Self::admit), but as a `Result`.
    pub async fn check(&self, identity: &ClientIdentity) -> Result<()> {
        match self.admit(identity).await {
            Decision::Allow => Ok(()),
            Decision::Reject => Err(SouschefError::RateLimitExceeded {
                per_minute: self.limits.per_minute,
                per_hour: self.limits.per_hour,
            }),
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limits", &self.limits)
            .field("enabled", &self.enabled)
            .field("primary", &self.primary.as_ref().map(|p| p.name()))
            .finish()
    }
}
