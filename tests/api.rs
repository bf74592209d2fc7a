//! End-to-end tests: boot the API on an ephemeral port and drive it over HTTP.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use medlog_lib::{
    db::Database,
    ocr::VisionProvider,
    server,
    settings::ServerSettings,
    AppState,
};
use reqwest::{multipart, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const LABEL_REPLY: &str = r#"```json
{"medicationName":"Atorvastatin","dosage":"20mg","instructions":"Take one tablet at bedtime","confidence":"high","rawText":"ATORVASTATIN 20 MG TABLETS"}
```"#;

struct StubVision;

#[async_trait]
impl VisionProvider for StubVision {
    async fn extract_label(&self, image_data_url: &str) -> Result<String> {
        assert!(image_data_url.starts_with("data:image/"));
        Ok(LABEL_REPLY.to_string())
    }
}

/// Counts calls without ever answering successfully.
#[derive(Default)]
struct CountingVision {
    calls: AtomicUsize,
}

#[async_trait]
impl VisionProvider for CountingVision {
    async fn extract_label(&self, _image_data_url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LABEL_REPLY.to_string())
    }
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    upload_dir: PathBuf,
    shutdown: CancellationToken,
    _data_dir: TempDir,
}

impl TestServer {
    async fn start(provider: Option<Arc<dyn VisionProvider>>) -> Self {
        Self::start_with(provider, |_| {}).await
    }

    async fn start_with(
        provider: Option<Arc<dyn VisionProvider>>,
        configure: impl FnOnce(&mut ServerSettings),
    ) -> Self {
        let data_dir = tempfile::tempdir().unwrap();
        let upload_dir = data_dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).unwrap();

        let mut settings = ServerSettings {
            database_path: data_dir.path().join("medlog.db"),
            upload_dir: upload_dir.clone(),
            preprocess_images: false,
            ..Default::default()
        };
        configure(&mut settings);
        let db = Database::new(settings.database_path.clone()).unwrap();
        let state = AppState::new(db, settings, provider);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let shutdown = CancellationToken::new();
        tokio::spawn(server::serve(listener, state, shutdown.clone()));

        Self {
            base_url,
            client: reqwest::Client::new(),
            upload_dir,
            shutdown,
            _data_dir: data_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn create_medication(&self, name: &str) -> i64 {
        let (status, body) = self
            .post_json("/api/medications", json!({ "name": name, "dosage": "10mg" }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

fn image_form(bytes: Vec<u8>, file_name: &str, mime: &str) -> multipart::Form {
    let part = multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .unwrap();
    multipart::Form::new().part("image", part)
}

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::start(None).await;
    let (status, body) = server.get_json("/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() {
    let server = TestServer::start(None).await;
    let (status, body) = server.get_json("/api/does-not-exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Route not found" }));
}

#[tokio::test]
async fn medication_crud_round_trip() {
    let server = TestServer::start(None).await;

    let id = server.create_medication("Lisinopril").await;

    let (status, body) = server.get_json("/api/medications").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["name"], "Lisinopril");
    assert_eq!(body["data"][0]["user_id"], 1);

    let response = server
        .client
        .put(server.url(&format!("/api/medications/{id}")))
        .json(&json!({ "name": "Lisinopril", "dosage": "20mg", "frequency": "daily" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["dosage"], "20mg");

    let response = server
        .client
        .delete(server.url(&format!("/api/medications/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Medication deleted successfully");

    let response = server
        .client
        .delete(server.url(&format!("/api/medications/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_without_name_is_rejected() {
    let server = TestServer::start(None).await;

    let (status, body) = server
        .post_json("/api/medications", json!({ "dosage": "5mg" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Medication name is required");

    let (_, body) = server.get_json("/api/medications").await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn update_of_missing_medication_is_404() {
    let server = TestServer::start(None).await;

    let response = server
        .client
        .put(server.url("/api/medications/4242"))
        .json(&json!({ "name": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Medication not found");
}

#[tokio::test]
async fn logs_survive_deleting_their_medication() {
    let server = TestServer::start(None).await;
    let id = server.create_medication("Warfarin").await;

    let (status, body) = server
        .post_json(&format!("/api/medications/{id}/log"), json!({ "notes": "morning" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["medication_name"], "Warfarin");

    server
        .client
        .delete(server.url(&format!("/api/medications/{id}")))
        .send()
        .await
        .unwrap();

    let (_, meds) = server.get_json("/api/medications").await;
    assert_eq!(meds["data"], json!([]));

    let (status, logs) = server.get_json("/api/medications/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs["data"].as_array().unwrap().len(), 1);
    assert_eq!(logs["data"][0]["medication_id"], id);
    assert!(logs["data"][0]["medication_name"].is_null());
}

#[tokio::test]
async fn logging_against_a_missing_medication_is_404() {
    let server = TestServer::start(None).await;
    let (status, body) = server.post_json("/api/medications/77/log", json!({})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn invalid_taken_at_is_a_bad_request() {
    let server = TestServer::start(None).await;
    let id = server.create_medication("Metformin").await;

    let (status, body) = server
        .post_json(
            &format!("/api/medications/{id}/log"),
            json!({ "taken_at": "last tuesday" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid taken_at timestamp");
}

#[tokio::test]
async fn stats_count_a_two_day_streak() {
    let server = TestServer::start(None).await;
    let id = server.create_medication("Levothyroxine").await;

    let now = Utc::now();
    for taken_at in [now, now - Duration::days(1), now - Duration::days(3)] {
        let (status, _) = server
            .post_json(
                &format!("/api/medications/{id}/log"),
                json!({ "taken_at": taken_at.to_rfc3339() }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = server.get_json("/api/users/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_medications"], 1);
    assert_eq!(body["data"]["logs_last_7_days"], 3);
    assert_eq!(body["data"]["streak_days"], 2);
}

#[tokio::test]
async fn identity_scopes_every_query() {
    let server = TestServer::start(None).await;

    let (status, _) = server
        .post_json(
            "/api/medications",
            json!({ "name": "Insulin", "user_id": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, demo) = server.get_json("/api/medications").await;
    assert_eq!(demo["data"], json!([]));

    let (_, by_query) = server.get_json("/api/medications?user_id=2").await;
    assert_eq!(by_query["data"][0]["name"], "Insulin");

    let response = server
        .client
        .get(server.url("/api/medications"))
        .header("x-user-id", "2")
        .send()
        .await
        .unwrap();
    let by_header: Value = response.json().await.unwrap();
    assert_eq!(by_header["data"][0]["name"], "Insulin");
}

#[tokio::test]
async fn profile_is_the_demo_user() {
    let server = TestServer::start(None).await;
    let (status, body) = server.get_json("/api/users/profile").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["email"], "demo@example.com");
}

#[tokio::test]
async fn analytics_summary_bundles_the_charts() {
    let server = TestServer::start(None).await;
    let id = server.create_medication("Vitamin D").await;
    server
        .post_json(&format!("/api/medications/{id}/log"), json!({}))
        .await;

    let (status, body) = server
        .get_json("/api/analytics/summary?days=14&months=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["daily"].as_array().unwrap().len(), 14);
    assert_eq!(body["data"]["monthly"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["streak"], 1);
    assert_eq!(body["data"]["weekly"]["logs"], 1);
    assert_eq!(body["data"]["medications"][0]["logs"], 1);

    let (status, _) = server.get_json("/api/analytics/summary?days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analytics_rejects_oversized_windows_as_json() {
    let server = TestServer::start(None).await;

    let (status, body) = server
        .get_json("/api/analytics/summary?window=4294967295")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "window must be between 1 and 366");

    let (status, body) = server.get_json("/api/analytics/summary?days=10000000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // The server is still serving after the rejected requests.
    let (status, _) = server.get_json("/api/analytics/summary").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_query_values_get_a_json_error() {
    let server = TestServer::start(None).await;

    let (status, body) = server.get_json("/api/analytics/summary?days=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("days"));

    let response = server
        .client
        .post(server.url("/api/images/optimize?quality=300"))
        .multipart(image_form(vec![0xFF; 2048], "label.jpg", "image/jpeg"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn ocr_extracts_fields_and_cleans_up() {
    let server = TestServer::start(Some(Arc::new(StubVision))).await;

    let response = server
        .client
        .post(server.url("/api/ocr/process-image"))
        .multipart(image_form(vec![0xFF; 8 * 1024], "label.jpg", "image/jpeg"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["confidence"], 90);
    assert_eq!(body["rawText"], "ATORVASTATIN 20 MG TABLETS");
    assert_eq!(body["parsedData"]["medicationName"], "Atorvastatin");
    assert_eq!(body["parsedData"]["dosage"], "20mg");
    assert!(body["parsedData"]["suggestions"].is_array());
    assert_eq!(file_count(&server.upload_dir), 0);
}

#[tokio::test]
async fn ocr_without_api_key_is_a_server_error() {
    let server = TestServer::start(None).await;

    let response = server
        .client
        .post(server.url("/api/ocr/process-image"))
        .multipart(image_form(vec![0xFF; 2048], "label.jpg", "image/jpeg"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "OpenAI API key not configured on server");
}

#[tokio::test]
async fn ocr_rejects_uploads_over_the_limit() {
    let vision = Arc::new(CountingVision::default());
    let server = TestServer::start_with(Some(vision.clone()), |settings| {
        settings.max_upload_mb = 1;
    })
    .await;

    let response = server
        .client
        .post(server.url("/api/ocr/process-image"))
        .multipart(image_form(
            vec![0xFF; 1536 * 1024],
            "label.jpg",
            "image/jpeg",
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "File too large");
    assert_eq!(vision.calls.load(Ordering::SeqCst), 0);
    assert_eq!(file_count(&server.upload_dir), 0);
}

#[tokio::test]
async fn ocr_rejects_non_images() {
    let server = TestServer::start(Some(Arc::new(StubVision))).await;

    let response = server
        .client
        .post(server.url("/api/ocr/process-image"))
        .multipart(image_form(b"plain text".to_vec(), "notes.txt", "text/plain"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Only image files are allowed!");
    assert_eq!(file_count(&server.upload_dir), 0);
}

#[tokio::test]
async fn ocr_without_a_file_is_a_bad_request() {
    let server = TestServer::start(Some(Arc::new(StubVision))).await;

    let form = multipart::Form::new().text("note", "no image here");
    let response = server
        .client
        .post(server.url("/api/ocr/process-image"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No image file provided");
}

#[tokio::test]
async fn optimize_returns_a_jpeg() {
    let server = TestServer::start(None).await;

    // Noisy pixels keep the PNG above the minimum upload size.
    let mut seed: u32 = 7;
    let image = image::RgbImage::from_fn(120, 40, |_, _| {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let v = (seed >> 16) as u8;
        image::Rgb([v, v.wrapping_mul(3), v.wrapping_add(90)])
    });
    let mut png = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .unwrap();

    let response = server
        .client
        .post(server.url("/api/images/optimize?max_dimension=60"))
        .multipart(image_form(png.into_inner(), "label.png", "image/png"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    assert_eq!(response.headers()["x-image-optimized"], "true");
    // 120x40 scaled to 60x20, then rotated upright.
    assert_eq!(response.headers()["x-image-width"], "20");
    assert_eq!(response.headers()["x-image-height"], "60");

    let bytes = response.bytes().await.unwrap();
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
}
