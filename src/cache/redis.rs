//! Redis cache backend.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use super::CacheBackend;
use crate::{Result, SouschefError};

/// Upper bound on a single Redis round trip.
const OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared cache over Redis `GET` / `SET EX` / `DEL` / `EXISTS`.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect to `url`, optionally overriding the password it carries.
    pub async fn connect(url: &str, password: Option<&str>) -> Result<Self> {
        let conn = connect_manager(url, password).await?;
        info!(url = %redact(url), "connected to redis cache");
        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

/// Open a multiplexed, auto-reconnecting connection.
pub(crate) async fn connect_manager(url: &str, password: Option<&str>) -> Result<ConnectionManager> {
    use redis::IntoConnectionInfo;

    let mut info = url
        .into_connection_info()
        .map_err(|e| SouschefError::Configuration(format!("invalid redis url: {e}")))?;
    if let Some(pw) = password {
        info.redis.password = Some(pw.to_string());
    }
    let client = redis::Client::open(info)
        .map_err(|e| SouschefError::Configuration(format!("invalid redis url: {e}")))?;
    tokio::time::timeout(OP_TIMEOUT, client.get_connection_manager())
        .await
        .map_err(|_| SouschefError::Backend("redis connect timed out".into()))?
        .map_err(redis_error)
}

pub(crate) fn redis_error(err: redis::RedisError) -> SouschefError {
    SouschefError::Backend(format!("redis: {err}"))
}

/// Run one Redis future under the op timeout.
pub(crate) async fn bounded<T>(
    fut: impl std::future::Future<Output = redis::RedisResult<T>>,
) -> Result<T> {
    tokio::time::timeout(OP_TIMEOUT, fut)
        .await
        .map_err(|_| SouschefError::Backend("redis operation timed out".into()))?
        .map_err(redis_error)
}

fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}***{}", &url[..scheme + 3], &url[at..]),
        _ => url.to_string(),
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        bounded(conn.get(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs().max(1);
        bounded(conn.set_ex(key, value, secs)).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = bounded(conn.del(key)).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        bounded(conn.exists(key)).await
    }
}
