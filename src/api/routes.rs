use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers;
use crate::auth::CredentialService;
use crate::pipeline::ConversionPipeline;
use crate::storage::{AudioStorage, AUDIO_URL_PREFIX};
use crate::store::AudioRecordStore;

pub struct AppState {
    pub pipeline: ConversionPipeline,
    pub records: AudioRecordStore,
    pub credentials: CredentialService,
}

pub fn create_router(state: Arc<AppState>, storage: &AudioStorage, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/convert_text", post(handlers::convert_text))
        .route("/convert_pdf", post(handlers::convert_pdf))
        .route("/convert_image", post(handlers::convert_image))
        .route("/audio-history", get(handlers::audio_history))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/health", get(handlers::health))
        .nest_service(AUDIO_URL_PREFIX, ServeDir::new(storage.root()))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{test_hashing, PasswordHasher};
    use crate::extract::image::sample_png;
    use crate::pipeline::testing::{fixture, Fixture};
    use crate::store::{memory_pool, UserStore};
    use crate::tts::testing::EchoEngine;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "XtextcastBoundary";

    async fn app() -> (Router, Fixture) {
        app_with_ocr("").await
    }

    async fn app_with_ocr(ocr_text: &'static str) -> (Router, Fixture) {
        app_with(ocr_text, 1024 * 1024).await
    }

    async fn app_with(ocr_text: &'static str, max_upload_bytes: usize) -> (Router, Fixture) {
        let fx = fixture(Arc::new(EchoEngine::default()), ocr_text).await;
        let users = UserStore::new(memory_pool().await);
        let credentials =
            CredentialService::new(users, PasswordHasher::new(test_hashing()).unwrap()).unwrap();
        let state = Arc::new(AppState {
            pipeline: fx.pipeline.clone(),
            records: fx.records.clone(),
            credentials,
        });
        (create_router(state, &fx.storage, max_upload_bytes), fx)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_upload(uri: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend(data);
        body.extend(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = send(app, request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn convert_text_returns_audio_path_and_serves_file() {
        let (app, _fx) = app().await;

        let (status, body) = send_json(&app, post_json("/convert_text", json!({ "text": "Hi" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Text converted to audio successfully");

        let path = body["audio_path"].as_str().unwrap().to_string();
        assert!(path.starts_with("/static/audio/") && path.ends_with(".mp3"));

        let (status, audio) = send(&app, get(&path)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(audio, b"Hi");
    }

    #[tokio::test]
    async fn convert_text_without_text_fails_generically() {
        let (app, fx) = app().await;

        let (status, body) = send_json(&app, post_json("/convert_text", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "Text conversion failed" }));

        let (status, _) = send_json(&app, post_json("/convert_text", json!({ "text": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(fx.records.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let (app, _fx) = app().await;

        let request = Request::builder()
            .method("POST")
            .uri("/convert_text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send_json(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Text conversion failed");
    }

    #[tokio::test]
    async fn malformed_pdf_upload_is_rejected() {
        let (app, fx) = app().await;

        let (status, body) =
            send_json(&app, post_upload("/convert_pdf", "file", "doc.pdf", b"garbage")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({ "message": "PDF conversion failed" }));
        assert!(fx.records.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_under_wrong_field_is_a_bad_request() {
        let (app, _fx) = app().await;

        let (status, body) =
            send_json(&app, post_upload("/convert_pdf", "document", "doc.pdf", b"%PDF")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "PDF conversion failed");
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let (app, fx) = app_with("", 256).await;

        let (status, body) =
            send_json(&app, post_upload("/convert_pdf", "file", "big.pdf", &[b'x'; 4096])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "message": "PDF conversion failed" }));
        assert!(fx.records.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn convert_image_uses_ocr_text() {
        let (app, _fx) = app_with_ocr("Hello sign").await;

        let (status, body) =
            send_json(&app, post_upload("/convert_image", "file", "sign.png", &sample_png())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Image converted to audio successfully");

        let (_, audio) = send(&app, get(body["audio_path"].as_str().unwrap())).await;
        assert_eq!(audio, b"Hello sign");
    }

    #[tokio::test]
    async fn history_lists_every_conversion() {
        let (app, _fx) = app().await;

        let mut paths = Vec::new();
        for text in ["one", "two", "three"] {
            let (_, body) = send_json(&app, post_json("/convert_text", json!({ "text": text }))).await;
            paths.push(body["audio_path"].as_str().unwrap().to_string());
        }

        let (status, body) = send_json(&app, get("/audio-history")).await;
        assert_eq!(status, StatusCode::OK);

        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        for (entry, path) in entries.iter().zip(&paths) {
            assert!(entry["id"].is_i64());
            assert_eq!(format!("/static/audio/{}", entry["filename"].as_str().unwrap()), *path);
        }
    }

    #[tokio::test]
    async fn register_and_login_flow() {
        let (app, _fx) = app().await;
        let alice = json!({ "username": "alice", "email": "a@example.com", "password": "pw1" });

        let (status, body) = send_json(&app, post_json("/register", alice.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Registration successful");

        let same_email = json!({ "username": "alice2", "email": "a@example.com", "password": "pw2" });
        let (status, body) = send_json(&app, post_json("/register", same_email)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "User already exists");

        let (status, body) = send_json(
            &app,
            post_json("/login", json!({ "email": "a@example.com", "password": "pw1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");

        let (wrong_status, wrong_body) = send_json(
            &app,
            post_json("/login", json!({ "email": "a@example.com", "password": "nope" })),
        )
        .await;
        let (unknown_status, unknown_body) = send_json(
            &app,
            post_json("/login", json!({ "email": "z@example.com", "password": "pw1" })),
        )
        .await;
        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, wrong_status);
        assert_eq!(unknown_body, wrong_body);
        assert_eq!(wrong_body, json!({ "message": "Invalid credentials" }));
    }

    #[tokio::test]
    async fn unknown_audio_is_not_found() {
        let (app, _fx) = app().await;
        let (status, _) = send(&app, get("/static/audio/missing.mp3")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (app, _fx) = app().await;
        let (status, body) = send_json(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
