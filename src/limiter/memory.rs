//! In-process timestamp log.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use super::{ClientIdentity, Decision, HOUR, MINUTE, RateLimits, WindowCounter};
use crate::Result;

/// Request timestamps per identity, oldest first.
///
/// Each check runs under the identity's map shard lock, so pruning,
/// counting and recording are atomic per identity.
#[derive(Default)]
pub struct MemoryWindow {
    log: DashMap<String, VecDeque<Instant>>,
}

impl MemoryWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous admission against the current instant.
    pub fn admit_now(&self, identity: &ClientIdentity, limits: RateLimits) -> Decision {
        let now = Instant::now();
        let mut entry = self.log.entry(identity.as_str().to_string()).or_default();
        let stamps = entry.value_mut();

        while let Some(&oldest) = stamps.front() {
            if now.duration_since(oldest) >= HOUR {
                stamps.pop_front();
            } else {
                break;
            }
        }

        let last_minute = stamps
            .iter()
            .rev()
            .take_while(|&&t| now.duration_since(t) < MINUTE)
            .count();
        if last_minute >= limits.per_minute as usize || stamps.len() >= limits.per_hour as usize {
            return Decision::Reject;
        }

        stamps.push_back(now);
        Decision::Allow
    }

    /// Number of identities currently tracked.
    pub fn tracked(&self) -> usize {
        self.log.len()
    }
}

#[async_trait]
impl WindowCounter for MemoryWindow {
    fn name(&self) -> &str {
        "memory"
    }

    async fn admit(&self, identity: &ClientIdentity, limits: RateLimits) -> Result<Decision> {
        Ok(self.admit_now(identity, limits))
    }
}
