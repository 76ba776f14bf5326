pub mod v1;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers::{database, fallback, files, health};
use crate::middleware::{cors_layer, json_method_not_allowed};
use crate::AppState;

/// Create the main router with the top-level API and the versioned routes
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes();
    let cors = cors_layer(&state.config.cors);

    Router::new()
        // Health and status
        .route("/health", get(health::health_check))
        .route("/", get(health::root))
        .route("/api/hello", get(health::hello))
        // Database
        .route("/api/data", get(database::get_data))
        // File handling
        .route("/api/upload", post(files::upload_file))
        .route("/api/list-images", get(files::list_images))
        .route("/api/generate-presigned-url", get(files::generate_presigned_url))
        .nest("/v1", v1::create_routes())
        .fallback(fallback::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(cors)
                .layer(axum::middleware::map_response(json_method_not_allowed)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::database::{DatabaseError, MockTimestampSource};
    use crate::storage::memory::MemoryStore;
    use crate::storage::{
        ListRequest, ObjectPage, ObjectStore, PresignedUrl, StorageError,
    };
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode},
    };
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "portfolio-test-boundary";

    fn test_config(overrides: &[(&'static str, &'static str)]) -> Arc<Config> {
        let mut vars: HashMap<&str, &str> = HashMap::from([
            ("DB_HOST", "localhost"),
            ("DB_USER", "portfolio"),
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "portfolio"),
            ("S3_BUCKET_NAME", "portfolio-images"),
            ("FRONTEND_DOMAIN", "https://portfolio.example.com"),
        ]);
        vars.extend(overrides.iter().copied());

        Arc::new(Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap())
    }

    fn app_with(
        db: MockTimestampSource,
        storage: Arc<dyn ObjectStore>,
        config: Arc<Config>,
    ) -> Router {
        create_router(AppState {
            config,
            db: Arc::new(db),
            storage,
        })
    }

    fn storage_app(store: Arc<MemoryStore>) -> Router {
        app_with(MockTimestampSource::new(), store, test_config(&[]))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn multipart_request(uri: &str, field: &str, filename: &str, body: &[u8]) -> Request<Body> {
        let mut payload = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        payload.extend_from_slice(body);
        payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(payload))
            .unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn upload(app: &Router, filename: &str, body: &[u8]) -> Value {
        let response = app
            .clone()
            .oneshot(multipart_request("/api/upload", "file", filename, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    /// Object store whose every call fails as if the service were unreachable
    struct UnreachableStore;

    #[async_trait]
    impl ObjectStore for UnreachableStore {
        async fn put_object(&self, _: &str, _: Bytes, _: &str) -> Result<(), StorageError> {
            Err(StorageError::Upload("dispatch failure".to_string()))
        }

        async fn list_objects(&self, _: ListRequest) -> Result<ObjectPage, StorageError> {
            Err(StorageError::List("dispatch failure".to_string()))
        }

        async fn presign_get(&self, _: &str, _: Duration) -> Result<PresignedUrl, StorageError> {
            Err(StorageError::Presign("no credentials".to_string()))
        }

        fn public_url(&self, key: &str) -> String {
            key.to_string()
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = storage_app(Arc::new(MemoryStore::new()));
        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_debug_env_endpoint_absent() {
        let app = storage_app(Arc::new(MemoryStore::new()));
        let response = app.oneshot(get_request("/api/debug-env")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn assert_json_error(response: Response<Body>, status: StatusCode, code: &str) {
        assert_eq!(response.status(), status);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], code);
    }

    #[tokio::test]
    async fn test_unknown_routes_return_json_404() {
        let app = storage_app(Arc::new(MemoryStore::new()));

        for uri in ["/nope", "/v1/nope"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_json_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
        }
    }

    #[tokio::test]
    async fn test_wrong_method_returns_json_405() {
        let app = storage_app(Arc::new(MemoryStore::new()));
        let request = Request::builder()
            .method("DELETE")
            .uri("/api/upload")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(response.headers().get("allow").is_some());
        assert_json_error(response, StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED").await;
    }

    #[tokio::test]
    async fn test_upload_with_non_multipart_body() {
        let store = Arc::new(MemoryStore::new());
        let app = storage_app(store.clone());
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"file":"photo.png"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_json_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_root_and_hello() {
        let app = storage_app(Arc::new(MemoryStore::new()));

        let root = json_body(app.clone().oneshot(get_request("/")).await.unwrap()).await;
        assert_eq!(root["status"], "running");
        assert_eq!(root["origin"], "https://portfolio.example.com");
        assert!(root["timestamp"].is_string());

        let hello = json_body(app.oneshot(get_request("/api/hello")).await.unwrap()).await;
        assert_eq!(hello, json!({ "message": "Hello from the backend!" }));
    }

    #[tokio::test]
    async fn test_database_time() {
        let fixed = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let mut db = MockTimestampSource::new();
        db.expect_current_time().times(1).returning(move || Ok(fixed));

        let app = app_with(db, Arc::new(MemoryStore::new()), test_config(&[]));
        let response = app.oneshot(get_request("/api/data")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["Date"], "2024-05-01T12:30:00Z");
        assert_eq!(body["message"], "Hello from the database!");
    }

    #[tokio::test]
    async fn test_database_failure_is_not_ok() {
        let mut db = MockTimestampSource::new();
        db.expect_current_time()
            .returning(|| Err(DatabaseError::Connection("connection refused".to_string())));

        let app = app_with(db, Arc::new(MemoryStore::new()), test_config(&[]));
        let response = app.oneshot(get_request("/api/data")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "DATABASE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_upload_generates_image_key() {
        let store = Arc::new(MemoryStore::new());
        let app = storage_app(store.clone());

        let body = upload(&app, "photo.png", b"\x89PNG fake image").await;

        let key = body["filename"].as_str().unwrap();
        let id = key
            .strip_prefix("images/")
            .and_then(|rest| rest.strip_suffix(".png"))
            .unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert!(body["file_url"].as_str().unwrap().contains(key));
        assert_eq!(body["content_type"], "image/png");
        assert_eq!(body["size"], 15);

        let stored = store.get(key).await.unwrap();
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(&stored.body[..], b"\x89PNG fake image");
    }

    #[tokio::test]
    async fn test_identical_uploads_get_distinct_keys() {
        let store = Arc::new(MemoryStore::new());
        let app = storage_app(store.clone());

        let first = upload(&app, "photo.png", b"same bytes").await;
        let second = upload(&app, "photo.png", b"same bytes").await;

        assert_ne!(first["filename"], second["filename"]);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let app = storage_app(Arc::new(MemoryStore::new()));
        let response = app
            .oneshot(multipart_request("/api/upload", "avatar", "photo.png", b"data"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_upload_over_limit() {
        let store = Arc::new(MemoryStore::new());
        let app = app_with(
            MockTimestampSource::new(),
            store.clone(),
            test_config(&[("MAX_UPLOAD_MB", "1")]),
        );

        let oversized = vec![0u8; 2 * 1024 * 1024];
        let response = app
            .oneshot(multipart_request("/api/upload", "file", "big.png", &oversized))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_upload_storage_failure() {
        let app = app_with(
            MockTimestampSource::new(),
            Arc::new(UnreachableStore),
            test_config(&[]),
        );
        let response = app
            .oneshot(multipart_request("/api/upload", "file", "photo.png", b"data"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "STORAGE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_list_reflects_current_bucket() {
        let store = Arc::new(MemoryStore::new());
        let app = storage_app(store.clone());

        let uploaded = upload(&app, "photo.jpg", b"jpeg").await;
        let key = uploaded["filename"].as_str().unwrap().to_string();

        let listed = json_body(
            app.clone()
                .oneshot(get_request("/api/list-images"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(listed["images"], json!([key.clone()]));
        assert_eq!(listed["is_truncated"], false);

        store.remove(&key).await;

        let listed = json_body(app.oneshot(get_request("/api/list-images")).await.unwrap()).await;
        assert_eq!(listed["images"], json!([]));
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let store = Arc::new(MemoryStore::new());
        for key in ["images/a.png", "images/b.png", "images/c.png", "docs/readme.txt"] {
            store
                .put_object(key, Bytes::from_static(b"x"), "image/png")
                .await
                .unwrap();
        }
        let app = storage_app(store);

        let first = json_body(
            app.clone()
                .oneshot(get_request("/api/list-images?prefix=images/&max_keys=2"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(first["images"], json!(["images/a.png", "images/b.png"]));
        assert_eq!(first["is_truncated"], true);

        let token = first["next_continuation_token"].as_str().unwrap();
        let second = json_body(
            app.oneshot(get_request(&format!(
                "/api/list-images?prefix=images/&max_keys=2&continuation_token={}",
                token
            )))
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(second["images"], json!(["images/c.png"]));
        assert_eq!(second["is_truncated"], false);
        assert!(second["next_continuation_token"].is_null());
    }

    #[tokio::test]
    async fn test_list_rejects_malformed_query() {
        let app = storage_app(Arc::new(MemoryStore::new()));
        let response = app
            .oneshot(get_request("/api/list-images?max_keys=lots"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_presigned_url_for_any_key() {
        let store = Arc::new(MemoryStore::new());
        let app = storage_app(store.clone());

        let response = app
            .oneshot(get_request("/api/generate-presigned-url?filename=images/x.png"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["url"].as_str().unwrap().contains("images/x.png"));
        assert_eq!(body["expires_in"], 3600);
        assert!(body["expires_at"].is_string());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_presigned_url_requires_filename() {
        let app = storage_app(Arc::new(MemoryStore::new()));

        for uri in [
            "/api/generate-presigned-url",
            "/api/generate-presigned-url?filename=",
        ] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_versioned_routes_mounted() {
        let store = Arc::new(MemoryStore::new());
        let app = storage_app(store.clone());

        let response = app
            .clone()
            .oneshot(multipart_request("/v1/images", "file", "logo.svg", b"<svg/>"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let key = json_body(response).await["filename"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(key.ends_with(".svg"));

        let listed = json_body(app.clone().oneshot(get_request("/v1/images")).await.unwrap()).await;
        assert_eq!(listed["images"], json!([key]));

        let presigned = app
            .oneshot(get_request("/v1/images/presign?filename=images/x.png"))
            .await
            .unwrap();
        assert_eq!(presigned.status(), StatusCode::OK);
    }
}
