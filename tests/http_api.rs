//! Router-level tests for the HTTP surface.
//!
//! The external tools are replaced with fakes that write real WAV files and
//! count how often they run; everything else (artifact store, model
//! registry, assembler, static file serving) is the production code.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vocal_split::api::{build_router, AppState};
use vocal_split::config::ServiceConfig;
use vocal_split::error::Result;
use vocal_split::media::{DurationProber, Transcoder};
use vocal_split::pipeline::Pipeline;
use vocal_split::separation::{SeparationRequest, Separator, MODEL_MARKER};
use vocal_split::types::{DisplayNames, JobId};

const BOUNDARY: &str = "vocal-split-test-boundary";
const PUBLIC_URL: &str = "http://127.0.0.1:9999";

fn write_wav(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..800 {
        writer.write_sample((i % 64) as i16 * 100).unwrap();
    }
    writer.finalize().unwrap();
}

#[derive(Default)]
struct FakeTranscoder {
    calls: AtomicUsize,
    audio_only: Mutex<Vec<bool>>,
}

impl Transcoder for FakeTranscoder {
    fn convert(&self, _input: &Path, output: &Path, audio_only: bool) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.audio_only.lock().unwrap().push(audio_only);
        write_wav(output);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-ffmpeg"
    }
}

#[derive(Default)]
struct FakeProber {
    calls: AtomicUsize,
}

impl DurationProber for FakeProber {
    fn probe_duration(&self, _path: &Path) -> f64 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        0.1
    }

    fn name(&self) -> &'static str {
        "fake-ffprobe"
    }
}

#[derive(Default)]
struct FakeSeparator {
    calls: AtomicUsize,
}

impl Separator for FakeSeparator {
    fn separate(&self, request: &SeparationRequest) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for stem in ["vocals", "accompaniment"] {
            write_wav(&request.output_dir.join(format!("{}.wav", stem)));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-spleeter"
    }
}

struct TestApp {
    dir: TempDir,
    app: Router,
    state: AppState,
    transcoder: Arc<FakeTranscoder>,
    prober: Arc<FakeProber>,
    separator: Arc<FakeSeparator>,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::rooted_at(dir.path());

    let model = config.effective_model_dir().join("2stems");
    fs::create_dir_all(&model).unwrap();
    fs::write(model.join(MODEL_MARKER), b"").unwrap();

    let transcoder = Arc::new(FakeTranscoder::default());
    let prober = Arc::new(FakeProber::default());
    let separator = Arc::new(FakeSeparator::default());
    let pipeline = Pipeline::from_config(&config, DisplayNames::standard())
        .unwrap()
        .with_transcoder(transcoder.clone())
        .with_prober(prober.clone())
        .with_separator(separator.clone());

    let state = AppState::new(pipeline, &config);
    TestApp {
        dir,
        app: build_router(state.clone()),
        state,
        transcoder,
        prober,
        separator,
    }
}

/// Builds a multipart body from `(field, filename, content)` parts.
fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Body {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
            ),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(multipart(parts))
        .unwrap()
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn upload(app: &Router, filename: &str, content: &[u8]) -> Value {
    let (status, json) = send(
        app,
        multipart_request("/upload", &[("audio", Some(filename), content)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json
}

#[tokio::test]
async fn upload_mp3_converts_without_dropping_video() {
    let t = test_app();
    let json = upload(&t.app, "song.mp3", b"ID3 fake mp3").await;

    assert_eq!(json["code"], 0);
    assert_eq!(json["data"], "song.wav");
    assert_eq!(*t.transcoder.audio_only.lock().unwrap(), [true]);
    assert!(t.dir.path().join("tmp/song.wav").is_file());
    assert!(!t.dir.path().join("tmp/song.mp3").exists());
}

#[tokio::test]
async fn upload_mov_drops_video_stream() {
    let t = test_app();
    let json = upload(&t.app, "clip.mov", b"fake quicktime").await;

    assert_eq!(json["code"], 0);
    assert_eq!(json["data"], "clip.wav");
    assert_eq!(*t.transcoder.audio_only.lock().unwrap(), [false]);
}

#[tokio::test]
async fn upload_wav_is_stored_directly() {
    let t = test_app();
    let json = upload(&t.app, "take.wav", b"RIFF....WAVEfmt ").await;

    assert_eq!(json["code"], 0);
    assert_eq!(json["data"], "take.wav");
    assert_eq!(json["msg"], "File uploaded successfully");
    assert_eq!(t.transcoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn double_upload_converts_once() {
    let t = test_app();
    let first = upload(&t.app, "song.mp3", b"ID3 fake mp3").await;
    let second = upload(&t.app, "song.mp3", b"ID3 fake mp3").await;

    assert_eq!(first["data"], second["data"]);
    assert_eq!(second["code"], 0);
    assert_eq!(t.transcoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsupported_format_is_rejected() {
    let t = test_app();
    let json = upload(&t.app, "notes.txt", b"hello").await;

    assert_eq!(json["code"], 1);
    assert_eq!(json["msg"], "Unsupported format .txt");
    assert!(json.get("data").is_none());
    assert_eq!(t.transcoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn traversal_filename_is_rejected() {
    let t = test_app();
    let json = upload(&t.app, "../../escape.wav", b"RIFF").await;

    assert_eq!(json["code"], 1);
    assert!(json["msg"].as_str().unwrap().contains("forbidden character"));
    assert!(!t.dir.path().join("escape.wav").exists());
    assert!(!t.dir.path().parent().unwrap().join("escape.wav").exists());
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let t = test_app();
    let (_, json) = send(
        &t.app,
        multipart_request("/upload", &[("other", Some("song.mp3"), b"data")]),
    )
    .await;
    assert_eq!(json["code"], 1);
    assert!(json["msg"].as_str().unwrap().contains("audio"));
}

#[tokio::test]
async fn non_multipart_body_gets_an_envelope() {
    let t = test_app();
    let (status, json) = send(&t.app, form_request("/upload", "audio=song.mp3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], 1);
}

#[tokio::test]
async fn process_with_unknown_model_stops_before_separation() {
    let t = test_app();
    upload(&t.app, "song.mp3", b"ID3 fake mp3").await;

    let (_, json) = send(
        &t.app,
        form_request("/process", "wav_name=song.wav&model=nonexistent_model"),
    )
    .await;

    assert_eq!(json["code"], 1);
    let msg = json["msg"].as_str().unwrap();
    assert!(msg.contains("nonexistent_model"));
    assert!(msg.contains("does not exist"));
    assert_eq!(t.prober.calls.load(Ordering::SeqCst), 0);
    assert_eq!(t.separator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn process_unknown_wav_is_reported() {
    let t = test_app();
    let (_, json) = send(
        &t.app,
        form_request("/process", "wav_name=ghost.wav&model=2stems"),
    )
    .await;

    assert_eq!(json["code"], 1);
    assert!(json["msg"].as_str().unwrap().contains("does not exist"));
    assert_eq!(t.separator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn process_publishes_downloadable_tracks() {
    let t = test_app();
    upload(&t.app, "song.mp3", b"ID3 fake mp3").await;

    let (_, json) = send(&t.app, form_request("/process", "wav_name=song.wav&model=2stems")).await;
    assert_eq!(json["code"], 0, "{}", json);
    assert_eq!(json["msg"], "Separation completed");

    let names = json["data"].as_array().unwrap();
    let urls = json["urllist"].as_array().unwrap();
    assert_eq!(names.len(), 2);
    assert_eq!(names.len(), urls.len());
    for (name, url) in names.iter().zip(urls) {
        let url = url.as_str().unwrap();
        assert!(url.starts_with(&format!("{}/static/files/song/", PUBLIC_URL)));
        assert!(url.ends_with(&format!("/{}.wav", name.as_str().unwrap())));
    }
    assert!(json["dirname"].as_str().unwrap().ends_with("song"));

    let path = urls[0].as_str().unwrap().trim_start_matches(PUBLIC_URL);
    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..4], b"RIFF");
}

#[tokio::test]
async fn track_urls_with_spaces_are_reachable() {
    let t = test_app();
    let json = upload(&t.app, "my song?.mp3", b"ID3 fake mp3").await;
    assert_eq!(json["data"], "my song?.wav");

    let (_, json) = send(
        &t.app,
        form_request("/process", "wav_name=my+song%3F.wav&model=2stems"),
    )
    .await;
    assert_eq!(json["code"], 0, "{}", json);

    let url = json["urllist"][0].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/static/files/my%20song%3F/", PUBLIC_URL)));

    let path = url.trim_start_matches(PUBLIC_URL);
    let response = t
        .app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn cached_upload_ignores_format_of_resubmission() {
    let t = test_app();
    upload(&t.app, "song.mp3", b"ID3 fake mp3").await;

    let json = upload(&t.app, "song.xyz", b"anything").await;
    assert_eq!(json["code"], 0);
    assert_eq!(json["data"], "song.wav");
    assert_eq!(json["msg"], "File uploaded successfully");
    assert_eq!(t.transcoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn process_accepts_query_string() {
    let t = test_app();
    upload(&t.app, "song.mp3", b"ID3 fake mp3").await;

    let request = Request::builder()
        .method("GET")
        .uri("/process?wav_name=song.wav&model=2stems")
        .body(Body::empty())
        .unwrap();
    let (_, json) = send(&t.app, request).await;
    assert_eq!(json["code"], 0, "{}", json);
}

#[tokio::test]
async fn api_uploads_and_separates() {
    let t = test_app();
    let (_, json) = send(
        &t.app,
        multipart_request(
            "/api",
            &[("file", Some("clip.mkv"), b"fake matroska"), ("model", None, b"2stems")],
        ),
    )
    .await;

    assert_eq!(json["code"], 0, "{}", json);
    let urls = json["data"].as_array().unwrap();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].as_str().unwrap().contains("/static/files/clip/"));
    assert_eq!(json["status_text"]["vocals.wav"], "vocals audio");
    assert_eq!(json["status_text"].as_object().unwrap().len(), 6);
    assert_eq!(t.transcoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(t.separator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn api_with_unknown_model_keeps_conversion() {
    let t = test_app();
    let (_, json) = send(
        &t.app,
        multipart_request(
            "/api",
            &[("file", Some("song.flac"), b"fLaC"), ("model", None, b"9stems")],
        ),
    )
    .await;

    assert_eq!(json["code"], 1);
    assert_eq!(t.separator.calls.load(Ordering::SeqCst), 0);
    let store = t.state.pipeline.store();
    assert!(store.has_canonical(&JobId::parse("song").unwrap()));
}

#[tokio::test]
async fn purge_forces_reconversion() {
    let t = test_app();
    upload(&t.app, "song.mp3", b"ID3 fake mp3").await;

    let (_, json) = send(&t.app, form_request("/purge", "wav_name=song.wav")).await;
    assert_eq!(json["code"], 0);
    assert!(!t.dir.path().join("tmp/song.wav").exists());

    upload(&t.app, "song.mp3", b"ID3 fake mp3").await;
    assert_eq!(t.transcoder.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn purge_rejects_unsafe_names() {
    let t = test_app();
    let (_, json) = send(&t.app, form_request("/purge", "wav_name=..%2Ftmp.wav")).await;
    assert_eq!(json["code"], 1);
}

#[tokio::test]
async fn check_update_without_notice() {
    let t = test_app();
    let request = Request::builder()
        .uri("/checkupdate")
        .body(Body::empty())
        .unwrap();
    let (_, json) = send(&t.app, request).await;
    assert_eq!(json["code"], 0);
    assert_eq!(json["msg"], "");

    t.state
        .update_notice
        .set("New version 9.9.9 available")
        .await;
    let request = Request::builder()
        .method("POST")
        .uri("/checkupdate")
        .body(Body::empty())
        .unwrap();
    let (_, json) = send(&t.app, request).await;
    assert_eq!(json["msg"], "New version 9.9.9 available");
}

#[tokio::test]
async fn models_lists_installed_models() {
    let t = test_app();
    let request = Request::builder().uri("/models").body(Body::empty()).unwrap();
    let (_, json) = send(&t.app, request).await;
    assert_eq!(json["code"], 0);
    assert_eq!(json["data"], serde_json::json!(["2stems"]));
}

#[tokio::test]
async fn health_reports_job_counts() {
    let t = test_app();
    upload(&t.app, "song.mp3", b"ID3 fake mp3").await;
    send(
        &t.app,
        form_request("/process", "wav_name=song.wav&model=nonexistent_model"),
    )
    .await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "vocal-split");
    assert_eq!(json["jobs_tracked"], 1);
    assert_eq!(json["jobs_failed"], 1);
}
