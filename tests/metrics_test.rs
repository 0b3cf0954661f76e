//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

use souschef::cache::{CacheBackend, CacheStore, MemoryCache};
use souschef::extract;
use souschef::limiter::{ClientIdentity, RateLimiter, RateLimits};
use souschef::providers::{GenerativeBackend, RetryConfig, RetryingBackend};
use souschef::telemetry;
use souschef::types::{GenerateOptions, GenerationRequest};
use souschef::{Result, SouschefError};

// ============================================================================
// Mocks
// ============================================================================

struct FlakyBackend {
    failures_left: AtomicU32,
}

#[async_trait]
impl GenerativeBackend for FlakyBackend {
    fn name(&self) -> &str {
        "flaky"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(SouschefError::Connection("reset by peer".into()));
        }
        Ok("done".into())
    }
}

struct BrokenCache;

#[async_trait]
impl CacheBackend for BrokenCache {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(SouschefError::Backend("down".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Err(SouschefError::Backend("down".into()))
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(SouschefError::Backend("down".into()))
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Err(SouschefError::Backend("down".into()))
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Counter value for a metric carrying the given label.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: (&str, &str)) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label.0 && l.value() == label.1)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn recorded<F: Future>(fut: F) -> (F::Output, Snapshotter) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let output = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
    });
    (output, snapshotter)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn retried_generation_records_request_retry_and_duration() {
    let (result, snapshotter) = recorded(async {
        let inner = Arc::new(FlakyBackend {
            failures_left: AtomicU32::new(1),
        });
        let backend = RetryingBackend::new(
            inner,
            RetryConfig::new()
                .max_attempts(3)
                .initial_delay(Duration::from_millis(1)),
        );
        backend
            .generate_text("hello", &GenerateOptions::default())
            .await
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(&snapshot, telemetry::GENERATION_REQUESTS_TOTAL, ("status", "ok")),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 1);
    assert!(has_histogram(
        &snapshot,
        telemetry::GENERATION_DURATION_SECONDS
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_generation_records_error_status() {
    let (result, snapshotter) = recorded(async {
        let inner = Arc::new(FlakyBackend {
            failures_left: AtomicU32::new(5),
        });
        let backend = RetryingBackend::new(inner, RetryConfig::disabled());
        backend
            .generate_text("hello", &GenerateOptions::default())
            .await
    });
    assert!(result.is_err());

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::GENERATION_REQUESTS_TOTAL,
            ("status", "error")
        ),
        1
    );
    assert_eq!(counter_total(&snapshot, telemetry::RETRIES_TOTAL), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_hits_and_misses_are_counted_by_namespace() {
    let (_, snapshotter) = recorded(async {
        let cache = CacheStore::new(Arc::new(MemoryCache::new(10)));
        let _: Option<String> = cache.get("recipes:a").await;
        cache.set("recipes:a", "value").await;
        let _: Option<String> = cache.get("recipes:a").await;
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::CACHE_MISSES_TOTAL,
            ("namespace", "recipes")
        ),
        1
    );
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::CACHE_HITS_TOTAL,
            ("namespace", "recipes")
        ),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cache_backend_failures_are_counted_not_raised() {
    let (written, snapshotter) = recorded(async {
        let cache = CacheStore::new(Arc::new(BrokenCache));
        let read: Option<String> = cache.get("recipes:a").await;
        assert!(read.is_none());
        cache.set("recipes:a", "value").await
    });
    assert!(!written);

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_ERRORS_TOTAL, ("operation", "get")),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_ERRORS_TOTAL, ("operation", "set")),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn rate_limit_rejections_are_counted() {
    let (_, snapshotter) = recorded(async {
        let limiter = RateLimiter::new(RateLimits {
            per_minute: 2,
            per_hour: 100,
        });
        let client = ClientIdentity::api_key("metrics-client");
        for _ in 0..3 {
            limiter.admit(&client).await;
        }
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::RATE_LIMIT_REJECTIONS_TOTAL),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::RATE_LIMIT_FALLBACKS_TOTAL),
        0
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn line_fallback_is_counted() {
    let (records, snapshotter) = recorded(async {
        extract::extract_list("tomato\nonion")
    });
    assert_eq!(records.len(), 2);

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::EXTRACTION_FALLBACKS_TOTAL),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let inner = Arc::new(FlakyBackend {
        failures_left: AtomicU32::new(0),
    });
    let backend = RetryingBackend::new(inner, RetryConfig::default());
    let text = backend
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "done");
}
