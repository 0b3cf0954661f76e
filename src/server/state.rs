//! Shared handler state and its construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::config::{CacheBackendKind, Config, Provider, Secrets};
use crate::cache::{CacheBackend, CacheStore, MemoryCache};
use crate::image::ImageFetcher;
use crate::limiter::RateLimiter;
use crate::providers::{GeminiBackend, GenerativeBackend, OllamaBackend, RetryingBackend};
use crate::services::{RecipeService, RecognitionService};
use crate::{Result, SouschefError};

/// Everything a handler needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub recognition: Arc<RecognitionService>,
    pub recipes: Arc<RecipeService>,
    pub limiter: Arc<RateLimiter>,
    pub backend: Arc<dyn GenerativeBackend>,
    pub cache: CacheStore,
    /// Key callers must present; `None` admits everyone.
    pub api_key: Option<Arc<str>>,
    /// Paths the rate limiter never sees.
    pub exempt_paths: Arc<[String]>,
}

impl AppState {
    /// Assemble state from ready-made components.
    ///
    /// `backend` is used as given; wrap it in a
    /// [`RetryingBackend`] first if it should retry.
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        cache: CacheStore,
        limiter: RateLimiter,
        fetcher: ImageFetcher,
    ) -> Self {
        Self {
            recognition: Arc::new(RecognitionService::new(
                backend.clone(),
                cache.clone(),
                fetcher,
            )),
            recipes: Arc::new(RecipeService::new(backend.clone(), cache.clone())),
            limiter: Arc::new(limiter),
            backend,
            cache,
            api_key: None,
            exempt_paths: Arc::from(Vec::new()),
        }
    }

    /// Require callers to present `key`.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Arc::from(key.into()));
        self
    }

    pub fn with_exempt_paths(mut self, paths: Vec<String>) -> Self {
        self.exempt_paths = Arc::from(paths);
        self
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    /// Build every component described by `config`.
    ///
    /// Redis is optional at runtime: if it cannot be reached the cache is
    /// disabled and the limiter counts in memory.
    pub async fn from_config(config: &Config, secrets: &Secrets) -> Result<Self> {
        let http_timeout = Duration::from_secs(config.http.timeout_secs);
        // Generation attempts are bounded only by the provider's attempt timeout.
        let generation_http =
            http_client(reqwest::Client::builder().connect_timeout(http_timeout))?;
        let download_http = http_client(reqwest::Client::builder().timeout(http_timeout))?;

        let backend = build_backend(config, secrets, generation_http);
        let redis_password = secrets.get("redis");
        let cache = build_cache(config, redis_password.as_deref()).await;
        let limiter = build_limiter(config, redis_password.as_deref()).await;
        let fetcher = ImageFetcher::new(download_http)
            .max_bytes(config.http.max_image_bytes)
            .timeout(Duration::from_secs(config.http.timeout_secs));

        let mut state = Self::new(backend, cache, limiter, fetcher)
            .with_exempt_paths(config.server.exempt_paths.clone());
        match secrets.get("service") {
            Some(key) => state = state.with_api_key(key),
            None => warn!("no service API key configured, requests are not authenticated"),
        }
        Ok(state)
    }
}

fn http_client(builder: reqwest::ClientBuilder) -> Result<reqwest::Client> {
    builder
        .build()
        .map_err(|e| SouschefError::Configuration(format!("failed to build HTTP client: {e}")))
}

fn build_backend(
    config: &Config,
    secrets: &Secrets,
    http: reqwest::Client,
) -> Arc<dyn GenerativeBackend> {
    let generative = &config.generative;
    let inner: Arc<dyn GenerativeBackend> = match generative.provider {
        Provider::Gemini => {
            let api_key = secrets.get("google");
            if api_key.is_none() {
                warn!("no Gemini API key configured, generation requests will fail");
            }
            Arc::new(
                GeminiBackend::with_base_url(
                    api_key,
                    &generative.gemini.model,
                    &generative.gemini.base_url,
                )
                .with_http_client(http),
            )
        }
        Provider::Ollama => Arc::new(
            OllamaBackend::new(&generative.ollama.base_url, &generative.ollama.model)
                .with_http_client(http),
        ),
    };
    info!(provider = inner.name(), "generative backend configured");
    Arc::new(RetryingBackend::new(inner, generative.retry_config()))
}

async fn build_cache(config: &Config, redis_password: Option<&str>) -> CacheStore {
    let cache = &config.cache;
    if !cache.enabled {
        info!("response cache disabled");
        return CacheStore::disabled();
    }

    let backend: Arc<dyn CacheBackend> = match cache.backend {
        CacheBackendKind::Memory => Arc::new(MemoryCache::new(cache.max_entries)),
        CacheBackendKind::Redis => match connect_redis_cache(&cache.url, redis_password).await {
            Ok(backend) => backend,
            Err(e) => {
                warn!(error = %e, "redis cache unavailable, caching disabled");
                return CacheStore::disabled();
            }
        },
    };
    info!(backend = backend.name(), "response cache enabled");
    CacheStore::new(backend).with_default_ttl(Duration::from_secs(cache.default_ttl_secs))
}

#[cfg(feature = "redis")]
async fn connect_redis_cache(url: &str, password: Option<&str>) -> Result<Arc<dyn CacheBackend>> {
    let cache = crate::cache::RedisCache::connect(url, password).await?;
    Ok(Arc::new(cache))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis_cache(_url: &str, _password: Option<&str>) -> Result<Arc<dyn CacheBackend>> {
    Err(SouschefError::NotConfigured(
        "redis support (built without the `redis` feature)".into(),
    ))
}

async fn build_limiter(config: &Config, redis_password: Option<&str>) -> RateLimiter {
    let rate_limit = &config.rate_limit;
    if !rate_limit.enabled {
        info!("rate limiting disabled");
        return RateLimiter::disabled();
    }

    let limiter = RateLimiter::new(rate_limit.limits());
    if !rate_limit.redis {
        return limiter;
    }
    match connect_redis_window(&config.cache.url, redis_password).await {
        Ok(primary) => limiter.with_primary(primary),
        Err(e) => {
            warn!(error = %e, "redis rate limiter unavailable, counting in memory");
            limiter
        }
    }
}

#[cfg(feature = "redis")]
async fn connect_redis_window(
    url: &str,
    password: Option<&str>,
) -> Result<Arc<dyn crate::limiter::WindowCounter>> {
    let window = crate::limiter::RedisWindow::connect(url, password).await?;
    Ok(Arc::new(window))
}

#[cfg(not(feature = "redis"))]
async fn connect_redis_window(
    _url: &str,
    _password: Option<&str>,
) -> Result<Arc<dyn crate::limiter::WindowCounter>> {
    Err(SouschefError::NotConfigured(
        "redis support (built without the `redis` feature)".into(),
    ))
}
