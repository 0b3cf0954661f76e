//! HTTP surface tests driven through `tower::ServiceExt::oneshot`.

#![cfg(feature = "server")]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use souschef::cache::CacheStore;
use souschef::image::ImageFetcher;
use souschef::limiter::{RateLimiter, RateLimits};
use souschef::providers::GenerativeBackend;
use souschef::server::{AppState, router};
use souschef::types::GenerationRequest;
use souschef::{Result, SouschefError};

const API_KEY: &str = "test-service-key";

const RECIPES_REPLY: &str = r#"[
  {"name": "Shakshuka", "ingredients_required": ["egg", "tomato"], "ingredients_missing": []}
]"#;

enum Reply {
    Text(&'static str),
    TimedOut,
}

struct StubBackend(Reply);

#[async_trait]
impl GenerativeBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        match self.0 {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::TimedOut => Err(SouschefError::BackendTimeout { attempts: 3 }),
        }
    }
}

fn state_with(reply: Reply, limits: RateLimits) -> AppState {
    AppState::new(
        Arc::new(StubBackend(reply)),
        CacheStore::disabled(),
        RateLimiter::new(limits),
        ImageFetcher::new(reqwest::Client::new()),
    )
    .with_exempt_paths(vec!["/".into(), "/api/ai/health".into()])
}

fn app() -> Router {
    router(state_with(Reply::Text(RECIPES_REPLY), RateLimits::default()).with_api_key(API_KEY))
}

fn post_json(uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn suggest_body() -> Value {
    json!({ "ingredients": ["egg", "tomato"] })
}

#[tokio::test]
async fn root_reports_service() {
    let response = app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "souschef");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn api_info_lists_endpoints() {
    let response = app().oneshot(get("/api/ai")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["endpoints"]["suggest_recipes"]["path"],
        "/api/ai/suggest-recipes"
    );
}

#[tokio::test]
async fn health_needs_no_key() {
    let response = app().oneshot(get("/api/ai/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["generative_available"], true);
    assert_eq!(body["provider"], "stub");
    assert_eq!(body["cache_enabled"], false);
}

#[tokio::test]
async fn missing_key_is_unauthorized() {
    let response = app()
        .oneshot(post_json("/api/ai/suggest-recipes", None, suggest_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn wrong_key_is_unauthorized_not_forbidden() {
    let response = app()
        .oneshot(post_json(
            "/api/ai/suggest-recipes",
            Some("not-the-key"),
            suggest_body(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Invalid API key");
}

#[tokio::test]
async fn valid_key_gets_suggestions() {
    let response = app()
        .oneshot(post_json(
            "/api/ai/suggest-recipes",
            Some(API_KEY),
            suggest_body(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_results"], 1);
    assert_eq!(body["recipes"][0]["name"], "Shakshuka");
    assert_eq!(body["recipes"][0]["match_percentage"], 100.0);
}

#[tokio::test]
async fn no_configured_key_admits_everyone() {
    let app = router(state_with(Reply::Text(RECIPES_REPLY), RateLimits::default()));
    let response = app
        .oneshot(post_json("/api/ai/suggest-recipes", None, suggest_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/ai/suggest-recipes")
        .header("content-type", "application/json")
        .header("X-API-Key", API_KEY)
        .body(Body::from("{\"ingredients\": "))
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn empty_ingredients_is_a_validation_error() {
    let response = app()
        .oneshot(post_json(
            "/api/ai/suggest-recipes",
            Some(API_KEY),
            json!({ "ingredients": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recognition_without_image_is_a_validation_error() {
    let response = app()
        .oneshot(post_json(
            "/api/ai/recognize-ingredients",
            Some(API_KEY),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn backend_timeout_is_gateway_timeout() {
    let app = router(state_with(Reply::TimedOut, RateLimits::default()).with_api_key(API_KEY));
    let response = app
        .oneshot(post_json(
            "/api/ai/generate-recipe-details",
            Some(API_KEY),
            json!({ "recipe_name": "Shakshuka", "ingredients": ["egg"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "BACKEND_TIMEOUT");
}

fn from_peer(mut request: Request<Body>, peer: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 40_000))));
    request
}

#[tokio::test]
async fn over_limit_requests_get_429() {
    let limits = RateLimits {
        per_minute: 2,
        per_hour: 100,
    };
    let app = router(state_with(Reply::Text(RECIPES_REPLY), limits));
    let suggest = |peer: [u8; 4], key: Option<&str>| {
        from_peer(
            post_json("/api/ai/suggest-recipes", key, suggest_body()),
            peer,
        )
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(suggest([10, 0, 0, 1], None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(suggest([10, 0, 0, 1], None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    // Another peer is unaffected.
    let response = app.clone().oneshot(suggest([10, 0, 0, 2], None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rotating_unverified_keys_does_not_reset_the_limit() {
    let limits = RateLimits {
        per_minute: 1,
        per_hour: 100,
    };
    let app = router(state_with(Reply::Text(RECIPES_REPLY), limits));

    let mut statuses = Vec::new();
    for i in 0..5 {
        let key = format!("{i:08}-rotating");
        let request = from_peer(
            post_json("/api/ai/suggest-recipes", Some(&key), suggest_body()),
            [10, 0, 0, 7],
        );
        statuses.push(app.clone().oneshot(request).await.unwrap().status());
    }
    assert_eq!(statuses[0], StatusCode::OK);
    assert!(
        statuses[1..]
            .iter()
            .all(|s| *s == StatusCode::TOO_MANY_REQUESTS)
    );
}

#[tokio::test]
async fn forged_key_prefix_cannot_spend_anothers_quota() {
    let limits = RateLimits {
        per_minute: 1,
        per_hour: 100,
    };
    let app = router(state_with(Reply::Text(RECIPES_REPLY), limits).with_api_key(API_KEY));

    // Same first eight characters as the service key, from another peer.
    let forged = from_peer(
        post_json("/api/ai/suggest-recipes", Some("test-serXXXX"), suggest_body()),
        [10, 0, 0, 9],
    );
    let response = app.clone().oneshot(forged).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let genuine = from_peer(
        post_json("/api/ai/suggest-recipes", Some(API_KEY), suggest_body()),
        [10, 0, 0, 1],
    );
    let response = app.clone().oneshot(genuine).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn exempt_paths_are_never_limited() {
    let limits = RateLimits {
        per_minute: 1,
        per_hour: 1,
    };
    let app = router(state_with(Reply::Text(RECIPES_REPLY), limits));
    for _ in 0..5 {
        let response = app.clone().oneshot(get("/api/ai/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
