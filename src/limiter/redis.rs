//! Redis window counters.
//!
//! Two auto-expiring counters per identity approximate the windows: the
//! minute key expires 60 s after its first increment and the hour key
//! 3600 s after its first. Counts reset when the key expires rather than
//! sliding. Every check reads the TTLs back, so a counter whose expiry was
//! never set is repaired on its next use.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::{ClientIdentity, Decision, HOUR, MINUTE, RateLimits, WindowCounter};
use crate::Result;
use crate::cache::redis::{bounded, connect_manager};

/// Counters under `ratelimit:<identity>:minute` and `…:hour`.
#[derive(Clone)]
pub struct RedisWindow {
    conn: ConnectionManager,
}

impl RedisWindow {
    pub async fn connect(url: &str, password: Option<&str>) -> Result<Self> {
        Ok(Self {
            conn: connect_manager(url, password).await?,
        })
    }

    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

pub(crate) fn window_keys(identity: &ClientIdentity) -> (String, String) {
    (
        format!("ratelimit:{identity}:minute"),
        format!("ratelimit:{identity}:hour"),
    )
}

/// `TTL` answers -1 for a key that exists without an expiry.
fn needs_expiry(ttl: i64) -> bool {
    ttl == -1
}

/// Give every counter found without a TTL its window, whichever call left
/// it so.
async fn repair_expiry(
    conn: &mut ConnectionManager,
    counters: [(&str, i64, Duration); 2],
) -> Result<()> {
    let mut expire = redis::pipe();
    let mut pending = false;
    for (key, ttl, window) in counters {
        if needs_expiry(ttl) {
            expire.expire(key, window.as_secs() as i64).ignore();
            pending = true;
        }
    }
    if pending {
        let () = bounded(expire.query_async(conn)).await?;
    }
    Ok(())
}

#[async_trait]
impl WindowCounter for RedisWindow {
    fn name(&self) -> &str {
        "redis"
    }

    async fn admit(&self, identity: &ClientIdentity, limits: RateLimits) -> Result<Decision> {
        let mut conn = self.conn.clone();
        let (minute_key, hour_key) = window_keys(identity);

        type Counts = (Option<u32>, Option<u32>, i64, i64);
        let (minute, hour, minute_ttl, hour_ttl): Counts = bounded(
            redis::pipe()
                .get(&minute_key)
                .get(&hour_key)
                .ttl(&minute_key)
                .ttl(&hour_key)
                .query_async(&mut conn),
        )
        .await?;
        if minute.unwrap_or(0) >= limits.per_minute || hour.unwrap_or(0) >= limits.per_hour {
            repair_expiry(
                &mut conn,
                [
                    (minute_key.as_str(), minute_ttl, MINUTE),
                    (hour_key.as_str(), hour_ttl, HOUR),
                ],
            )
            .await?;
            return Ok(Decision::Reject);
        }

        let (_, _, minute_ttl, hour_ttl): (u32, u32, i64, i64) = bounded(
            redis::pipe()
                .atomic()
                .incr(&minute_key, 1)
                .incr(&hour_key, 1)
                .ttl(&minute_key)
                .ttl(&hour_key)
                .query_async(&mut conn),
        )
        .await?;
        repair_expiry(
            &mut conn,
            [
                (minute_key.as_str(), minute_ttl, MINUTE),
                (hour_key.as_str(), hour_ttl, HOUR),
            ],
        )
        .await?;

        Ok(Decision::Allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_per_identity_and_window() {
        let (minute, hour) = window_keys(&ClientIdentity::api_key("abcdefghij"));
        assert_eq!(minute, "ratelimit:key:abcdefgh:minute");
        assert_eq!(hour, "ratelimit:key:abcdefgh:hour");
    }

    #[test]
    fn counters_without_ttl_are_given_one() {
        assert!(needs_expiry(-1));
        assert!(!needs_expiry(59));
        assert!(!needs_expiry(0));
        // -2 means the key is gone; there is nothing to expire.
        assert!(!needs_expiry(-2));
    }
}
