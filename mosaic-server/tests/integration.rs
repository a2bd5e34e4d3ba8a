use axum::body::Body;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use mosaic_core::{
    BuildError, BuildParameters, MemoryArtifactStore, MosaicArtifact, MosaicBuilder,
    MosaicPipeline,
};
use mosaic_server::{routes::build_router, AppState, ServerConfig, TelemetryConfig};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const PUBLIC_URL: &str = "http://mosaic.test";
const BOUNDARY: &str = "mosaic-test-boundary";

fn test_state() -> (TempDir, Arc<AppState>) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = ServerConfig {
        cors_enabled: false,
        public_url: Some(PUBLIC_URL.to_string()),
        storage_path: Some(tmp.path().join("artifacts")),
        ingest_dir: Some(tmp.path().join("ingest")),
        ..Default::default()
    };
    let telemetry = TelemetryConfig::with_server_config(&cfg);
    let state = Arc::new(AppState::new(cfg, telemetry).expect("AppState::new"));
    (tmp, state)
}

fn png(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(w, h, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Hand-assembled multipart/form-data body
#[derive(Default)]
struct Form {
    body: Vec<u8>,
}

impl Form {
    fn file(mut self, field: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn text(mut self, field: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// mainImage=A.png, tiles=[B.png, C.png] plus the given parameters
fn standard_form(grid_num: &str, output_width: &str) -> Form {
    Form::default()
        .file("mainImage", "A.png", &png(40, 20, [180, 60, 60]))
        .file("tiles", "B.png", &png(8, 8, [255, 0, 0]))
        .file("tiles", "C.png", &png(8, 8, [0, 0, 255]))
        .text("gridNum", grid_num)
        .text("outputWidth", output_width)
}

async fn json_body(resp: http::Response<Body>) -> (StatusCode, JsonValue) {
    let status = resp.status();
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let json: JsonValue = serde_json::from_slice(&bytes).expect("valid JSON response");
    (status, json)
}

fn ingest_dirs(tmp: &TempDir) -> usize {
    std::fs::read_dir(tmp.path().join("ingest"))
        .map(|rd| rd.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn health_check_ok() {
    let (_tmp, state) = test_state();
    let app = build_router(state);

    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("ok"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn upload_generates_mosaic_and_serves_it() {
    let (tmp, state) = test_state();
    let app = build_router(state.clone());

    let resp = app
        .clone()
        .oneshot(standard_form("10", "250").into_request())
        .await
        .unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK, "body: {json}");
    assert_eq!(
        json.get("message").and_then(|v| v.as_str()),
        Some("Mosaic generated successfully.")
    );
    let path = json.get("path").and_then(|v| v.as_str()).unwrap().to_string();
    let prefix = format!("{PUBLIC_URL}/artifacts/finalMosaic-");
    assert!(path.starts_with(&prefix), "unexpected path {path}");
    assert!(path.ends_with(".png"));

    // Scratch directory removed once the request finished
    assert_eq!(ingest_dirs(&tmp), 0);

    // Artifact retrievable through the server
    let route = path.trim_start_matches(PUBLIC_URL).to_string();
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(route)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "image/png"
    );
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!(img.width(), 250);

    assert_eq!(state.completed_count(), 1);
    assert_eq!(state.failed_count(), 0);
}

#[tokio::test]
async fn invalid_grid_num_is_400() {
    for bad in ["0", "101", "abc"] {
        let (tmp, state) = test_state();
        let app = build_router(state);
        let resp = app
            .oneshot(standard_form(bad, "250").into_request())
            .await
            .unwrap();
        let (status, json) = json_body(resp).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "gridNum={bad}");
        assert_eq!(
            json.get("@type").and_then(|v| v.as_str()),
            Some("err:mosaic/InvalidGridNum")
        );
        assert!(json
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap()
            .contains("gridNum"));
        assert_eq!(ingest_dirs(&tmp), 0);
    }
}

#[tokio::test]
async fn invalid_output_width_is_400() {
    let (_tmp, state) = test_state();
    let app = build_router(state);
    let resp = app
        .oneshot(standard_form("10", "0").into_request())
        .await
        .unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json.get("@type").and_then(|v| v.as_str()),
        Some("err:mosaic/InvalidOutputWidth")
    );
}

#[tokio::test]
async fn zero_tiles_is_400() {
    let (_tmp, state) = test_state();
    let app = build_router(state.clone());
    let form = Form::default()
        .file("mainImage", "A.png", &png(10, 10, [1, 2, 3]))
        .text("gridNum", "10")
        .text("outputWidth", "250");
    let resp = app.oneshot(form.into_request()).await.unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json.get("@type").and_then(|v| v.as_str()),
        Some("err:mosaic/MissingTiles")
    );
    assert_eq!(state.failed_count(), 1);
}

#[tokio::test]
async fn second_main_image_is_400() {
    let (_tmp, state) = test_state();
    let app = build_router(state);
    let form = standard_form("10", "250").file("mainImage", "A2.png", &png(4, 4, [0, 0, 0]));
    let resp = app.oneshot(form.into_request()).await.unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json.get("@type").and_then(|v| v.as_str()),
        Some("err:mosaic/BadRequest")
    );
}

#[tokio::test]
async fn unknown_fields_ignored() {
    let (_tmp, state) = test_state();
    let app = build_router(state);
    let form = standard_form("5", "64").text("caption", "hello");
    let resp = app.oneshot(form.into_request()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn undecodable_tile_is_500() {
    let (tmp, state) = test_state();
    let app = build_router(state);
    let form = standard_form("10", "250").file("tiles", "D.png", b"not an image");
    let resp = app.oneshot(form.into_request()).await.unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json.get("@type").and_then(|v| v.as_str()),
        Some("err:mosaic/BuildFailure")
    );
    assert_eq!(json.get("status").and_then(|v| v.as_u64()), Some(500));
    assert_eq!(
        json.get("error").and_then(|v| v.as_str()),
        Some(mosaic_server::error::SERVER_ERROR_MESSAGE)
    );
    assert_eq!(ingest_dirs(&tmp), 0);
}

#[tokio::test]
async fn tall_main_image_at_max_width_is_400() {
    let (tmp, state) = test_state();
    let app = build_router(state.clone());
    let form = Form::default()
        .file("mainImage", "tall.png", &png(1, 4000, [90, 90, 90]))
        .file("tiles", "B.png", &png(8, 8, [255, 0, 0]))
        .text("gridNum", "10")
        .text("outputWidth", "10000");
    let resp = app.oneshot(form.into_request()).await.unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json.get("@type").and_then(|v| v.as_str()),
        Some("err:mosaic/OutputTooLarge")
    );
    assert_eq!(ingest_dirs(&tmp), 0);
    assert_eq!(state.failed_count(), 1);
}

#[derive(Debug)]
struct SlowBuilder(Duration);

impl MosaicBuilder for SlowBuilder {
    fn build(
        &self,
        _main_image: &Path,
        _tiles: &[PathBuf],
        _params: &BuildParameters,
    ) -> Result<MosaicArtifact, BuildError> {
        std::thread::sleep(self.0);
        Err(BuildError::NoTiles)
    }
}

#[tokio::test]
async fn build_timeout_is_500() {
    let tmp = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        ingest_dir: Some(tmp.path().to_path_buf()),
        ..Default::default()
    };
    let pipeline = MosaicPipeline::new(
        Arc::new(SlowBuilder(Duration::from_millis(500))),
        Arc::new(MemoryArtifactStore::new(PUBLIC_URL)),
    )
    .with_build_timeout(Duration::from_millis(50));
    let state = Arc::new(AppState::with_pipeline(
        config,
        TelemetryConfig::default(),
        pipeline,
    ));
    let app = build_router(state);

    let resp = app
        .oneshot(standard_form("10", "250").into_request())
        .await
        .unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json.get("@type").and_then(|v| v.as_str()),
        Some("err:mosaic/BuildTimeout")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_get_unique_paths() {
    let (_tmp, state) = test_state();
    let app = build_router(state.clone());

    let requests = (0..6).map(|_| {
        let app = app.clone();
        tokio::spawn(async move {
            let resp = app
                .oneshot(standard_form("4", "32").into_request())
                .await
                .unwrap();
            json_body(resp).await
        })
    });
    let results = futures::future::join_all(requests).await;

    let paths: HashSet<String> = results
        .into_iter()
        .map(|r| {
            let (status, json) = r.unwrap();
            assert_eq!(status, StatusCode::OK);
            json["path"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(paths.len(), 6);
    assert_eq!(state.completed_count(), 6);
}

#[tokio::test]
async fn blob_upload_round_trip() {
    let (_tmp, state) = test_state();
    let app = build_router(state);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/blob?filename=notes.txt")
                .body(Body::from("hello mosaic"))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["contentType"], "text/plain");
    assert_eq!(json["size"], 12);
    let pathname = json["pathname"].as_str().unwrap();
    assert!(pathname.starts_with("notes-"));

    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/artifacts/{pathname}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"hello mosaic");
}

#[tokio::test]
async fn blob_without_filename_is_400() {
    let (_tmp, state) = test_state();
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/blob")
                .body(Body::from("x"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_artifact_is_404() {
    let (_tmp, state) = test_state();
    let app = build_router(state);
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/artifacts/finalMosaic-1-0-deadbeef.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json.get("@type").and_then(|v| v.as_str()),
        Some("err:mosaic/NotFound")
    );
}

#[tokio::test]
async fn stats_reports_counts() {
    let (_tmp, state) = test_state();
    let app = build_router(state);

    let _ = app
        .clone()
        .oneshot(standard_form("0", "250").into_request())
        .await
        .unwrap();

    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, json) = json_body(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["storage_type"], "file");
    assert_eq!(json["completed"], 0);
    assert_eq!(json["failed"], 1);
    assert!(json.get("uptime_secs").and_then(|v| v.as_u64()).is_some());
}
