//! Configuration loading for souschefd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.souschef/config.toml` (user)
//! 3. `/etc/souschef/config.toml` (system)
//! 4. Built-in defaults
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.souschef/secrets.toml` (user, must be 0600)
//! 2. `/etc/souschef/secrets.toml` (system, must be 0600)
//!
//! Every secret falls back to an environment variable.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::limiter::RateLimits;
use crate::providers::RetryConfig;
use crate::{Result, SouschefError};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generative: GenerativeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:8000).
    #[serde(default = "default_address")]
    pub address: String,
    /// Paths that skip rate limiting.
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            exempt_paths: default_exempt_paths(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_exempt_paths() -> Vec<String> {
    ["/", "/api/ai/health", "/docs", "/redoc", "/openapi.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Which generative backend serves requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Ollama,
}

/// Generative backend selection and per-backend settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerativeConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Gemini settings. The API key lives in secrets.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
    /// Total attempts per generation call.
    #[serde(default = "default_gemini_retries")]
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            base_url: default_gemini_url(),
            timeout_secs: default_gemini_timeout(),
            max_retries: default_gemini_retries(),
        }
    }
}

fn default_gemini_model() -> String {
    crate::providers::gemini::DEFAULT_MODEL.to_string()
}

fn default_gemini_url() -> String {
    crate::providers::gemini::DEFAULT_BASE_URL.to_string()
}

fn default_gemini_timeout() -> u64 {
    120
}

fn default_gemini_retries() -> u32 {
    3
}

/// Ollama settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    /// Ollama base URL (default: http://localhost:11434).
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
    /// Total attempts per generation call.
    #[serde(default = "default_ollama_retries")]
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout(),
            max_retries: default_ollama_retries(),
        }
    }
}

fn default_ollama_url() -> String {
    crate::providers::ollama::DEFAULT_BASE_URL.to_string()
}

fn default_ollama_model() -> String {
    crate::providers::ollama::DEFAULT_MODEL.to_string()
}

fn default_ollama_timeout() -> u64 {
    300
}

fn default_ollama_retries() -> u32 {
    2
}

impl GenerativeConfig {
    /// Retry policy for the selected provider.
    pub fn retry_config(&self) -> RetryConfig {
        let (attempts, timeout) = match self.provider {
            Provider::Gemini => (self.gemini.max_retries, self.gemini.timeout_secs),
            Provider::Ollama => (self.ollama.max_retries, self.ollama.timeout_secs),
        };
        RetryConfig::new()
            .max_attempts(attempts)
            .attempt_timeout(Duration::from_secs(timeout))
    }
}

/// Where cached values are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Redis,
    Memory,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub backend: CacheBackendKind,
    /// Redis URL, shared with the distributed rate limiter.
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Capacity of the memory backend.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: CacheBackendKind::default(),
            url: default_redis_url(),
            default_ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_max_entries() -> u64 {
    10_000
}

/// Rate limiter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,
    /// Count in Redis (at `[cache] url`) so limits hold across instances.
    #[serde(default)]
    pub redis: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
            redis: false,
        }
    }
}

impl RateLimitConfig {
    pub fn limits(&self) -> RateLimits {
        RateLimits {
            per_minute: self.per_minute,
            per_hour: self.per_hour,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_per_minute() -> u32 {
    60
}

fn default_per_hour() -> u32 {
    1000
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout for the shared HTTP client.
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

fn default_http_timeout() -> u64 {
    120
}

fn default_max_image_bytes() -> usize {
    crate::image::MAX_IMAGE_BYTES
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    /// Gemini API key.
    #[serde(default)]
    pub google: Option<ApiKeySecret>,
    /// Key callers must present in `X-API-Key`.
    #[serde(default)]
    pub service: Option<ApiKeySecret>,
    #[serde(default)]
    pub redis: Option<PasswordSecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// A password secret.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordSecret {
    pub password: String,
}

/// Secret name → environment variables, tried in order.
const SECRET_ENV_VARS: &[(&str, &[&str])] = &[
    ("google", &["GOOGLE_API_KEY", "GOOGLE_GENERATIVE_AI_API_KEY"]),
    ("service", &["SOUSCHEF_API_KEY"]),
    ("redis", &["REDIS_PASSWORD"]),
];

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first file found in
    /// the user and system locations wins; if neither exists the built-in
    /// defaults are used. Environment overrides are applied last.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => {
                info!("no config file found, using defaults");
                Config::default()
            }
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SouschefError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config = toml::from_str(&content).map_err(|e| {
            SouschefError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Resolve the config file path, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(SouschefError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".souschef").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/souschef/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Apply `REDIS_ENABLED` and `REDIS_URL` from `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(enabled) = lookup("REDIS_ENABLED") {
            self.cache.enabled = matches!(
                enabled.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(url) = lookup("REDIS_URL").filter(|u| !u.trim().is_empty()) {
            self.cache.url = url;
        }
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.souschef/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/souschef/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (env vars still apply).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".souschef").join("secrets.toml");
            if user_secrets.exists() {
                Self::check_permissions(&user_secrets)?;
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/souschef/secrets.toml");
        if system_secrets.exists() {
            Self::check_permissions(&system_secrets)?;
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SouschefError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SouschefError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    pub fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            SouschefError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(SouschefError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Look up a secret, falling back to the process environment.
    pub fn get(&self, name: &str) -> Option<String> {
        self.get_with(name, |var| std::env::var(var).ok())
    }

    /// Look up a secret, falling back to `lookup` for its environment variables.
    pub fn get_with(&self, name: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        let from_file = match name {
            "google" => self.google.as_ref().map(|s| s.api_key.clone()),
            "service" => self.service.as_ref().map(|s| s.api_key.clone()),
            "redis" => self.redis.as_ref().map(|s| s.password.clone()),
            _ => None,
        };

        from_file.filter(|s| !s.is_empty()).or_else(|| {
            SECRET_ENV_VARS
                .iter()
                .find(|(secret, _)| *secret == name)
                .and_then(|(_, vars)| {
                    vars.iter()
                        .find_map(|var| lookup(var).filter(|v| !v.is_empty()))
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.address, "0.0.0.0:8000");
        assert!(config.server.exempt_paths.contains(&"/api/ai/health".to_string()));
        assert_eq!(config.generative.provider, Provider::Gemini);
        assert_eq!(config.generative.gemini.timeout_secs, 120);
        assert_eq!(config.generative.gemini.max_retries, 3);
        assert_eq!(config.generative.ollama.model, "llava");
        assert_eq!(config.generative.ollama.timeout_secs, 300);
        assert_eq!(config.generative.ollama.max_retries, 2);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.backend, CacheBackendKind::Redis);
        assert_eq!(config.cache.default_ttl_secs, 3600);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.limits(), RateLimits::default());
        assert_eq!(config.http.max_image_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:9000"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "127.0.0.1:9000");
        // Defaults preserved
        assert_eq!(config.server.exempt_paths.len(), 5);
        assert_eq!(config.rate_limit.per_minute, 60);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:8080"
            exempt_paths = ["/"]

            [generative]
            provider = "ollama"

            [generative.ollama]
            base_url = "http://gpu-box:11434"
            model = "llava:13b"
            max_retries = 4

            [cache]
            enabled = true
            backend = "memory"
            max_entries = 50

            [rate_limit]
            per_minute = 10
            per_hour = 100
            redis = true

            [http]
            timeout_secs = 30
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.exempt_paths, vec!["/".to_string()]);
        assert_eq!(config.generative.provider, Provider::Ollama);
        assert_eq!(config.generative.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.generative.ollama.model, "llava:13b");
        assert_eq!(config.generative.ollama.timeout_secs, 300);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(
            config.rate_limit.limits(),
            RateLimits {
                per_minute: 10,
                per_hour: 100
            }
        );
        assert!(config.rate_limit.redis);
        assert_eq!(config.http.timeout_secs, 30);

        let retry = config.generative.retry_config();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.attempt_timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let toml = r#"
            [generative]
            provider = "openai"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn env_overrides_redis_settings() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            ("REDIS_ENABLED", "True"),
            ("REDIS_URL", "redis://cache:6380"),
        ]));
        assert!(config.cache.enabled);
        assert_eq!(config.cache.url, "redis://cache:6380");

        config.apply_env_overrides(env(&[("REDIS_ENABLED", "false")]));
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.url, "redis://cache:6380");
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [google]
            api_key = "AIza-test"

            [service]
            api_key = "svc-key"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.google.as_ref().unwrap().api_key, "AIza-test");
        assert_eq!(secrets.service.as_ref().unwrap().api_key, "svc-key");
        assert!(secrets.redis.is_none());
    }

    #[test]
    fn secrets_prefer_file_over_env() {
        let secrets = Secrets {
            google: Some(ApiKeySecret {
                api_key: "from-file".to_string(),
            }),
            ..Default::default()
        };
        let lookup = env(&[("GOOGLE_API_KEY", "from-env")]);
        assert_eq!(
            secrets.get_with("google", &lookup),
            Some("from-file".to_string())
        );
        // Unknown secret returns None
        assert_eq!(secrets.get_with("nonexistent", &lookup), None);
    }

    #[test]
    fn secrets_fall_back_through_env_vars_in_order() {
        let secrets = Secrets::default();
        let lookup = env(&[
            ("GOOGLE_GENERATIVE_AI_API_KEY", "second"),
            ("REDIS_PASSWORD", "hunter2"),
        ]);
        assert_eq!(secrets.get_with("google", &lookup), Some("second".to_string()));
        assert_eq!(secrets.get_with("redis", &lookup), Some("hunter2".to_string()));
        assert_eq!(secrets.get_with("service", &lookup), None);
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn load_from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit]\nenabled = false").unwrap();
        let config = Config::load_from_file(file.path()).unwrap();
        assert!(!config.rate_limit.enabled);
    }

    #[test]
    fn invalid_toml_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\naddress =").unwrap();
        let err = Config::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, SouschefError::Configuration(_)));
    }

    #[cfg(unix)]
    #[test]
    fn world_readable_secrets_are_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let file = tempfile::NamedTempFile::new().unwrap();
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o644)).unwrap();
        let err = Secrets::check_permissions(file.path()).unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));

        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600)).unwrap();
        assert!(Secrets::check_permissions(file.path()).is_ok());
    }
}
