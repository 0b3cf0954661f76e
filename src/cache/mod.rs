//! Response cache.
//!
//! [`CacheStore`] is the facade the services talk to. It serializes values
//! to JSON text and hands them to a [`CacheBackend`]: [`RedisCache`] for a
//! shared cache across instances, or [`MemoryCache`] for a single process.
//! A disabled store turns every call into a no-op.
//!
//! The store never fails its caller. Backend errors are logged and counted,
//! then treated as a miss (reads) or a failed write.

pub mod key;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use key::{CacheKey, KeyPart};
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::Result;
use crate::telemetry;

/// Default time-to-live for cached values.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Time-to-live for recognition results.
pub const RECOGNITION_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Key-value storage with per-entry TTL.
///
/// Implementations report their failures; [`CacheStore`] decides what to do
/// with them.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Returns whether a value was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;
}

/// JSON-valued cache over an optional backend.
#[derive(Clone)]
pub struct CacheStore {
    backend: Option<Arc<dyn CacheBackend>>,
    default_ttl: Duration,
}

impl CacheStore {
    /// Enabled store over the given backend.
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Store that caches nothing.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Override the TTL used by [`set`](Self::set).
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Backend name, or `"disabled"`.
    pub fn backend_name(&self) -> &str {
        self.backend.as_deref().map_or("disabled", |b| b.name())
    }

    /// Fetch and decode a value. Any failure is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let namespace = telemetry::key_namespace(key);

        let raw = match backend.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, backend = backend.name(), "cache get failed");
                metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "get")
                    .increment(1);
                None
            }
        };

        let Some(raw) = raw else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "namespace" => namespace)
                .increment(1);
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "namespace" => namespace)
                    .increment(1);
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "cached value failed to decode");
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "namespace" => namespace)
                    .increment(1);
                None
            }
        }
    }

    /// Store a value with the default TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    /// Store a value. Returns whether the write reached the backend.
    pub async fn set_with_ttl<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "value not serializable, skipping cache write");
                return false;
            }
        };
        match backend.set(key, raw, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, backend = backend.name(), "cache set failed");
                metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "set")
                    .increment(1);
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        backend.delete(key).await.unwrap_or_else(|e| {
            warn!(key, error = %e, backend = backend.name(), "cache delete failed");
            metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "delete").increment(1);
            false
        })
    }

    pub async fn exists(&self, key: &str) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        backend.exists(key).await.unwrap_or_else(|e| {
            warn!(key, error = %e, backend = backend.name(), "cache exists failed");
            metrics::counter!(telemetry::CACHE_ERRORS_TOTAL, "operation" => "exists").increment(1);
            false
        })
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend_name())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
