mod sync;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use catsync_engine::SyncPhase;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, require_bearer_auth, AuthState, RequestId};
use crate::runner::SharedRunner;

#[derive(Clone)]
pub struct AppState {
    pub runner: SharedRunner,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    phase: SyncPhase,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/sync", post(sync::trigger_sync))
        .route(
            "/api/v1/sync/categories/cleanup",
            post(sync::cleanup_categories),
        )
        .route("/api/v1/sync/status", get(sync::sync_status))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            phase: state.runner.phase(),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use catsync_core::{AppConfig, Environment, Locale};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::runner::SyncRunner;

    fn test_config(printful_api_url: String, directus_url: String) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            bind_addr: "127.0.0.1:0".parse().expect("socket addr"),
            log_level: "info".to_string(),
            printful_api_url,
            printful_api_token: "pf-token".to_string(),
            printful_store_id: None,
            directus_url,
            directus_token: "static-token".to_string(),
            request_timeout_secs: 5,
            user_agent: "catsync-test/0.1".to_string(),
            max_retries: 0,
            retry_backoff_base_ms: 1,
            page_size: 100,
            product_delay_ms: 0,
            detail_timeout_secs: 5,
            catalog_timeout_secs: 5,
            default_locale: Locale::En,
            translation_locales: Vec::new(),
            dictionary_path: None,
            prune_stale_variants: false,
            prune_categories: false,
            sync_cron: None,
        }
    }

    fn runner(directus_url: String) -> SharedRunner {
        runner_with_catalog("http://127.0.0.1:9".to_string(), directus_url)
    }

    fn runner_with_catalog(printful_api_url: String, directus_url: String) -> SharedRunner {
        let config = test_config(printful_api_url, directus_url);
        Arc::new(SyncRunner::from_app_config(&config).expect("runner"))
    }

    fn open_app(runner: SharedRunner) -> Router {
        let auth = AuthState::from_keys("", true).expect("auth");
        build_app(AppState { runner }, auth)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json parse")
    }

    fn post(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn api_error_conflict_maps_to_409() {
        let response = ApiError::new("req-1", "conflict", "busy").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn health_is_public_and_echoes_request_id() {
        let auth = AuthState::from_keys("secret", false).expect("auth");
        let app = build_app(
            AppState {
                runner: runner("http://127.0.0.1:9".to_string()),
            },
            auth,
        );

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("req-42")
        );
        let json = json_body(response).await;
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["phase"], "idle");
        assert_eq!(json["meta"]["request_id"], "req-42");
    }

    #[tokio::test]
    async fn protected_routes_require_a_known_bearer_token() {
        let auth = AuthState::from_keys("secret", false).expect("auth");
        let app = build_app(
            AppState {
                runner: runner("http://127.0.0.1:9".to_string()),
            },
            auth,
        );

        let anonymous = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sync/status")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let authorized = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sync/status")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(authorized.status(), StatusCode::OK);
        let json = json_body(authorized).await;
        assert_eq!(json["data"]["phase"], "idle");
        assert_eq!(json["data"]["running"], false);
        assert!(json["data"]["last_run"].is_null());
    }

    #[tokio::test]
    async fn second_trigger_while_running_is_a_conflict() {
        let runner = runner("http://127.0.0.1:9".to_string());
        let _held = runner.guard.try_lock().expect("guard free");
        let app = open_app(Arc::clone(&runner));

        let response = app.oneshot(post("/api/v1/sync")).await.expect("response");

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "conflict");
    }

    #[tokio::test]
    async fn unreachable_store_fails_the_sync_with_500() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/categories"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "errors": [{"message": "Service Unavailable"}]
            })))
            .mount(&server)
            .await;
        let app = open_app(runner(server.uri()));

        let response = app
            .clone()
            .oneshot(post("/api/v1/sync"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"]
            .as_str()
            .is_some_and(|e| e.contains("probing")));

        let status = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sync/status")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let json = json_body(status).await;
        assert_eq!(json["data"]["phase"], "failed");
        assert_eq!(json["data"]["last_run"]["success"], false);
        assert_eq!(json["data"]["last_run"]["trigger"], "api");
    }

    #[tokio::test]
    async fn successful_sync_returns_flat_success_body() {
        let printful = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "result": {"categories": []}
            })))
            .mount(&printful)
            .await;
        Mock::given(method("GET"))
            .and(path("/store/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "result": [],
                "paging": {"total": 0, "offset": 0, "limit": 100}
            })))
            .mount(&printful)
            .await;
        let directus = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&directus)
            .await;
        let app = open_app(runner_with_catalog(printful.uri(), directus.uri()));

        let response = app.oneshot(post("/api/v1/sync")).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["categories"]["created"], 0);
        assert_eq!(json["categories"]["failed"], 0);
        assert_eq!(json["products"]["created"], 0);
        assert_eq!(json["products"]["deleted"], 0);
        assert!(json.get("error").is_none());
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn empty_store_token_fails_as_configuration_error() {
        let mut config = test_config(
            "http://127.0.0.1:9".to_string(),
            "http://127.0.0.1:9".to_string(),
        );
        config.directus_token = String::new();
        let runner = Arc::new(SyncRunner::from_app_config(&config).expect("runner"));
        let app = open_app(runner);

        let response = app.oneshot(post("/api/v1/sync")).await.expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"]
            .as_str()
            .is_some_and(|e| e.starts_with("configuration error")));
    }

    #[tokio::test]
    async fn sync_keeps_running_after_the_request_is_dropped() {
        let directus = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/categories"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&directus)
            .await;
        let runner = runner(directus.uri());
        let app = open_app(Arc::clone(&runner));

        let request = app.oneshot(post("/api/v1/sync"));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), request)
                .await
                .is_err(),
            "request should still be waiting on the store"
        );

        let mut status = runner.status().await;
        for _ in 0..100 {
            if status.last_run.is_some() && !status.running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            status = runner.status().await;
        }

        let last = status.last_run.expect("run finished without its caller");
        assert_eq!(last.trigger, crate::runner::Trigger::Api);
        assert!(!status.running);
    }

    #[tokio::test]
    async fn cleanup_endpoint_removes_younger_duplicates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"id": 11, "printful_id": 5, "name": "Men's Wear"},
                    {"id": 10, "printful_id": 5, "name": "Men's Wear"},
                    {"id": 12, "printful_id": 6, "name": "Hats"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/items/categories/11"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        let app = open_app(runner(server.uri()));

        let response = app
            .oneshot(post("/api/v1/sync/categories/cleanup"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"]["groups"], 1);
        assert_eq!(json["data"]["deleted"], 1);
        assert_eq!(json["data"]["failed"], 0);
    }
}
