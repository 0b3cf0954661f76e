//! Ingredient recognition from images.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::{prompts, round_seconds};
use crate::cache::key::hash_hex;
use crate::cache::{CacheKey, CacheStore, RECOGNITION_TTL};
use crate::extract;
use crate::image::{ImageCodec, ImageFetcher, StandardCodec};
use crate::providers::GenerativeBackend;
use crate::types::{GenerateOptions, Ingredient, RecognitionRequest, RecognitionResponse};
use crate::{Result, SouschefError};

/// Where the image comes from. Exactly one per request.
enum ImageSource<'a> {
    Url(&'a str),
    Base64(&'a str),
}

impl<'a> ImageSource<'a> {
    fn from_request(request: &'a RecognitionRequest) -> Result<Self> {
        let url = request.image_url.as_deref().filter(|s| !s.trim().is_empty());
        let data = request
            .image_base64
            .as_deref()
            .filter(|s| !s.trim().is_empty());
        match (url, data) {
            (Some(url), None) => Ok(ImageSource::Url(url)),
            (None, Some(data)) => Ok(ImageSource::Base64(data)),
            (Some(_), Some(_)) => Err(SouschefError::InvalidInput(
                "provide either image_url or image_base64, not both".into(),
            )),
            (None, None) => Err(SouschefError::InvalidInput(
                "either image_url or image_base64 must be provided".into(),
            )),
        }
    }

    fn cache_key(&self) -> String {
        let digest = match self {
            ImageSource::Url(url) => hash_hex(url.trim().as_bytes(), 64),
            ImageSource::Base64(data) => hash_hex(data.trim().as_bytes(), 64),
        };
        CacheKey::new("ingredients").arg(digest).build()
    }
}

/// Recognize ingredients in a photo.
///
/// Results are cached for a week under a digest of the image URL or
/// payload, so repeat requests for the same image skip the backend.
pub struct RecognitionService {
    backend: Arc<dyn GenerativeBackend>,
    cache: CacheStore,
    fetcher: ImageFetcher,
    codec: Arc<dyn ImageCodec>,
}

impl RecognitionService {
    pub fn new(backend: Arc<dyn GenerativeBackend>, cache: CacheStore, fetcher: ImageFetcher) -> Self {
        Self {
            backend,
            cache,
            fetcher,
            codec: Arc::new(StandardCodec::new()),
        }
    }

    /// Replace the image codec.
    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResponse> {
        let start = Instant::now();
        let source = ImageSource::from_request(request)?;
        let key = source.cache_key();

        if let Some(ingredients) = self.cache.get::<Vec<Ingredient>>(&key).await {
            debug!(key, count = ingredients.len(), "recognition served from cache");
            return Ok(RecognitionResponse {
                ingredients,
                processing_time: round_seconds(start.elapsed()),
            });
        }

        let raw = match source {
            ImageSource::Url(url) => self.fetcher.fetch(url).await?,
            ImageSource::Base64(data) => self.fetcher.decode_base64(data)?,
        };

        let codec = Arc::clone(&self.codec);
        let jpeg = tokio::task::spawn_blocking(move || codec.normalize(&raw))
            .await
            .map_err(|e| SouschefError::Backend(format!("image processing task failed: {e}")))??;

        let text = self
            .backend
            .generate_with_image(prompts::RECOGNITION, &jpeg, &GenerateOptions::default())
            .await?;

        let ingredients: Vec<Ingredient> = extract::extract_list(&text)
            .iter()
            .filter_map(Ingredient::from_record)
            .collect();

        if ingredients.is_empty() {
            debug!(key, "nothing recognized, result not cached");
        } else {
            self.cache
                .set_with_ttl(&key, &ingredients, RECOGNITION_TTL)
                .await;
        }

        let processing_time = round_seconds(start.elapsed());
        info!(
            provider = self.backend.name(),
            count = ingredients.len(),
            processing_time,
            "recognized ingredients"
        );
        Ok(RecognitionResponse {
            ingredients,
            processing_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_source_is_required() {
        assert!(ImageSource::from_request(&RecognitionRequest::default()).is_err());
        let both = RecognitionRequest {
            image_url: Some("https://example.com/a.jpg".into()),
            image_base64: Some("aGVsbG8=".into()),
        };
        assert!(matches!(
            ImageSource::from_request(&both),
            Err(SouschefError::InvalidInput(_))
        ));
        assert!(ImageSource::from_request(&RecognitionRequest::from_url("https://x.io/a.png")).is_ok());
    }

    #[test]
    fn cache_key_is_namespaced_digest() {
        let req = RecognitionRequest::from_url("https://example.com/a.jpg");
        let key = ImageSource::from_request(&req).unwrap().cache_key();
        let (ns, digest) = key.split_once(':').unwrap();
        assert_eq!(ns, "ingredients");
        assert_eq!(digest.len(), 64);
    }
}
