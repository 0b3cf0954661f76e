//! Image acquisition and normalization.
//!
//! [`ImageFetcher`] turns a URL or a base64 payload into raw bytes, enforcing
//! the size limit. An [`ImageCodec`] then validates the bytes and produces
//! the normalized JPEG sent to the generative backend.

use std::io::Cursor;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use reqwest::{Client, Url};
use tracing::debug;

use crate::providers::RetryConfig;
use crate::providers::retry::with_retry;
use crate::{Result, SouschefError};

/// Largest accepted image payload (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Normalized images fit inside a square of this size.
pub const MAX_DIMENSION: u32 = 1024;

/// Download attempts before giving up.
const DOWNLOAD_ATTEMPTS: u32 = 3;

/// Decode, validate and re-encode images.
pub trait ImageCodec: Send + Sync {
    /// Validate `raw` and return a normalized JPEG.
    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>>;
}

/// Codec backed by the `image` crate: RGB, at most 1024×1024, JPEG.
#[derive(Debug, Clone)]
pub struct StandardCodec {
    max_dimension: u32,
}

impl StandardCodec {
    pub fn new() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
        }
    }

    pub fn max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max.max(1);
        self
    }
}

impl Default for StandardCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for StandardCodec {
    fn normalize(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let decoded = image::load_from_memory(raw)
            .map_err(|e| SouschefError::InvalidImage(e.to_string()))?;

        let max = self.max_dimension;
        let fitted = if decoded.width() > max || decoded.height() > max {
            decoded.resize(max, max, FilterType::Lanczos3)
        } else {
            decoded
        };

        let rgb = DynamicImage::ImageRgb8(fitted.to_rgb8());
        let mut out = Cursor::new(Vec::new());
        rgb.write_to(&mut out, ImageFormat::Jpeg)
            .map_err(|e| SouschefError::InvalidImage(format!("JPEG encoding failed: {e}")))?;
        Ok(out.into_inner())
    }
}

/// Fetch image bytes from a URL or decode them from base64.
#[derive(Clone)]
pub struct ImageFetcher {
    http: Client,
    retry: RetryConfig,
    max_bytes: usize,
}

impl ImageFetcher {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            retry: RetryConfig::new().max_attempts(DOWNLOAD_ATTEMPTS),
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    pub fn max_bytes(mut self, max: usize) -> Self {
        self.max_bytes = max;
        self
    }

    /// Bound each download attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.retry = self.retry.attempt_timeout(timeout);
        self
    }

    /// Override the download retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Download an image, retrying transient failures.
    ///
    /// Client errors from the host are invalid input; anything still failing
    /// after the retry budget is reported as unavailable.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = parse_image_url(url)?;
        with_retry(&self.retry, "image", "download_image", || {
            self.download(url.clone())
        })
        .await
        .map_err(|e| match e {
            SouschefError::BackendTimeout { attempts } => SouschefError::BackendUnavailable(
                format!("image download timed out after {attempts} attempt(s)"),
            ),
            SouschefError::Api { status, message } => {
                SouschefError::BackendUnavailable(format!("image host returned {status}: {message}"))
            }
            SouschefError::GenerationFailed(msg) => SouschefError::BackendUnavailable(msg),
            other => other,
        })
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>> {
        debug!(%url, "downloading image");
        let mut response = self.http.get(url).send().await?;
        let status = response.status();
        if status.is_client_error() {
            return Err(SouschefError::InvalidInput(format!(
                "image URL returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(SouschefError::Api {
                status: status.as_u16(),
                message: status.to_string(),
            });
        }
        if let Some(len) = response.content_length()
            && len as usize > self.max_bytes
        {
            return Err(SouschefError::ImageTooLarge {
                size: len as usize,
                max: self.max_bytes,
            });
        }
        // Hosts may omit Content-Length; enforce the cap while streaming.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            self.check_size(body.len() + chunk.len())?;
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    /// Decode a base64 payload, tolerating a `data:` URL prefix and
    /// embedded whitespace.
    pub fn decode_base64(&self, data: &str) -> Result<Vec<u8>> {
        let payload = match data.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => data,
        };
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(SouschefError::InvalidInput("empty base64 image".into()));
        }
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| SouschefError::InvalidInput(format!("invalid base64 image: {e}")))?;
        self.check_size(bytes.len())?;
        Ok(bytes)
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_bytes {
            return Err(SouschefError::ImageTooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }
}

/// Accept only absolute http(s) URLs with a host.
fn parse_image_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| SouschefError::InvalidInput(format!("invalid image URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(SouschefError::InvalidInput(format!(
            "image URL must be http or https: {raw}"
        )));
    }
    Ok(url)
}
