//! End-to-end tests for a full sync pass.
//!
//! These tests exercise the real HTTP-backed `SyncEngine` with:
//! - A temporary xochitl directory of `.metadata` records
//! - An in-process axum server standing in for both the Zotero web API
//!   (paginated with `Link` headers) and the tablet's `/upload` endpoint
//!
//! Everything binds to 127.0.0.1; no external network I/O.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;

use zotsync_core::errors::{CoreError, RemoteRequestError, TransferError};
use zotsync_core::{build_http_engine, SyncConfig, SyncPass};

const USER_ID: &str = "42";
const API_KEY: &str = "test-key";
const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
/// How long the `/slow` file host waits before answering.
const STALL: Duration = Duration::from_secs(5);

// ===========================================================================
// Mock server
// ===========================================================================

#[derive(Debug, Clone)]
struct RecordedUpload {
    content_type: String,
    accept: String,
    body: Vec<u8>,
}

#[derive(Clone)]
struct MockState {
    base: String,
    uploads: Arc<Mutex<Vec<RecordedUpload>>>,
    downloads: Arc<Mutex<Vec<String>>>,
    upload_status: StatusCode,
}

#[derive(Deserialize)]
struct PageQuery {
    start: Option<usize>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("Zotero-API-Key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
        && headers.get("Zotero-API-Version").and_then(|v| v.to_str().ok()) == Some("3")
}

fn json_page(body: serde_json::Value, next: Option<String>) -> Response {
    let mut resp = Json(body).into_response();
    if let Some(next) = next {
        let link = format!(r#"<{next}>; rel="next", <{next}>; rel="last""#);
        resp.headers_mut()
            .insert(header::LINK, HeaderValue::from_str(&link).unwrap());
    }
    resp
}

async fn collections(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(q): Query<PageQuery>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match q.start.unwrap_or(0) {
        0 => json_page(
            json!([{
                "key": "C1",
                "version": 3,
                "data": {"key": "C1", "name": "Papers", "parentCollection": false}
            }]),
            Some(format!("{}/users/{USER_ID}/collections?start=1", state.base)),
        ),
        _ => json_page(
            json!([
                {"key": "C2", "data": {"name": "Unrelated"}},
                {"key": "C3", "data": {"name": "Broken"}},
                {"key": "C4", "data": {"name": "Slow"}}
            ]),
            None,
        ),
    }
}

async fn collection_items(
    State(state): State<MockState>,
    headers: HeaderMap,
    UrlPath((_user, key)): UrlPath<(String, String)>,
    Query(q): Query<PageQuery>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let base = &state.base;
    match (key.as_str(), q.start.unwrap_or(0)) {
        ("C1", 0) => json_page(
            json!([{"key": "I1", "data": {
                "itemType": "attachment",
                "contentType": "application/pdf",
                "filename": "a.pdf",
                "url": format!("{base}/files/a.pdf")
            }}]),
            Some(format!("{base}/users/{USER_ID}/collections/C1/items?start=1")),
        ),
        ("C1", _) => json_page(
            json!([
                {"key": "I2", "data": {
                    "itemType": "attachment",
                    "contentType": DOCX_CONTENT_TYPE,
                    "filename": "b.docx",
                    "url": format!("{base}/files/b.docx")
                }},
                {"key": "I3", "data": {"itemType": "journalArticle", "title": "Parent item"}}
            ]),
            None,
        ),
        ("C2", _) => json_page(
            json!([{"key": "I4", "data": {
                "contentType": "application/pdf",
                "filename": "unrelated.pdf",
                "url": format!("{base}/files/unrelated.pdf")
            }}]),
            None,
        ),
        ("C3", _) => json_page(
            json!([{"key": "I5", "data": {
                "contentType": "application/pdf",
                "filename": "gone.pdf",
                "url": format!("{base}/missing/gone.pdf")
            }}]),
            None,
        ),
        ("C4", _) => json_page(
            json!([{"key": "I6", "data": {
                "contentType": "application/pdf",
                "filename": "slow.pdf",
                "url": format!("{base}/slow/slow.pdf")
            }}]),
            None,
        ),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn file(State(state): State<MockState>, UrlPath(name): UrlPath<String>) -> Response {
    state.downloads.lock().unwrap().push(name.clone());
    format!("%PDF-1.4 {name}").into_response()
}

async fn stalled_file(
    State(state): State<MockState>,
    UrlPath(name): UrlPath<String>,
) -> Response {
    tokio::time::sleep(STALL).await;
    file(State(state), UrlPath(name)).await
}

async fn upload(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    state.uploads.lock().unwrap().push(RecordedUpload {
        content_type: header_str(header::CONTENT_TYPE),
        accept: header_str(header::ACCEPT),
        body: body.to_vec(),
    });
    state.upload_status
}

async fn spawn_mock(upload_status: StatusCode) -> MockState {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = MockState {
        base: format!("http://{addr}"),
        uploads: Arc::default(),
        downloads: Arc::default(),
        upload_status,
    };

    let app = Router::new()
        .route("/users/:user/collections", get(collections))
        .route("/users/:user/collections/:key/items", get(collection_items))
        .route("/files/:name", get(file))
        .route("/slow/:name", get(stalled_file))
        .route("/upload", post(upload))
        .with_state(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    state
}

// ===========================================================================
// Helpers
// ===========================================================================

fn write_record(dir: &Path, id: &str, kind: &str, name: &str) {
    let json = json!({
        "deleted": false,
        "lastModified": "1700000000000",
        "parent": "",
        "pinned": false,
        "synced": true,
        "type": kind,
        "version": 1,
        "visibleName": name
    });
    std::fs::write(dir.join(format!("{id}.metadata")), json.to_string()).unwrap();
}

fn tablet_with_folders(names: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (i, name) in names.iter().enumerate() {
        write_record(dir.path(), &format!("folder-{i}"), "CollectionType", name);
    }
    dir
}

fn config_for(mock: &MockState, library: &Path, api_key: &str) -> SyncConfig {
    let mut config = SyncConfig::default();
    config.zotero.api_url = mock.base.clone();
    config.zotero.user_id = Some(USER_ID.into());
    config.zotero.api_key = Some(api_key.into());
    config.tablet.library_dir = library.to_path_buf();
    config.tablet.upload_url = format!("{}/upload", mock.base);
    config.validate().unwrap();
    config
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_pass_uploads_only_missing_pdf_of_matched_collection() {
    let mock = spawn_mock(StatusCode::OK).await;
    let tablet = tablet_with_folders(&["Papers"]);
    let engine = build_http_engine(&config_for(&mock, tablet.path(), API_KEY)).unwrap();

    let stats = engine.run_pass().await.unwrap();

    assert_eq!(stats.folders_scanned, 1);
    assert_eq!(stats.collections_listed, 4);
    assert_eq!(stats.pairs_matched, 1);
    assert_eq!(stats.files_planned, 1);
    assert_eq!(stats.files_transferred, 1);
    assert_eq!(*mock.downloads.lock().unwrap(), vec!["a.pdf"]);

    let uploads = mock.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    let up = &uploads[0];
    assert!(up.content_type.starts_with("multipart/form-data; boundary="));
    assert_eq!(up.accept, "*/*");
    let body = String::from_utf8_lossy(&up.body);
    assert!(body.contains(r#"name="file"; filename="a.pdf""#), "body: {body}");
    assert!(body.contains("%PDF-1.4 a.pdf"));
}

#[tokio::test]
async fn test_second_pass_after_ingestion_transfers_nothing() {
    let mock = spawn_mock(StatusCode::OK).await;
    let tablet = tablet_with_folders(&["Papers"]);
    let engine = build_http_engine(&config_for(&mock, tablet.path(), API_KEY)).unwrap();

    engine.run_pass().await.unwrap();
    assert_eq!(mock.uploads.lock().unwrap().len(), 1);

    // the tablet ingests the upload as a document with a stored PDF
    write_record(tablet.path(), "doc-a", "DocumentType", "a.pdf");
    std::fs::write(tablet.path().join("doc-a.pdf"), b"%PDF-1.4 a.pdf").unwrap();

    let stats = engine.run_pass().await.unwrap();
    assert_eq!(stats.documents_present, 1);
    assert_eq!(stats.files_planned, 0);
    assert_eq!(mock.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_document_without_stored_pdf_does_not_suppress_transfer() {
    let mock = spawn_mock(StatusCode::OK).await;
    let tablet = tablet_with_folders(&["Papers"]);
    write_record(tablet.path(), "doc-a", "DocumentType", "a.pdf");
    let engine = build_http_engine(&config_for(&mock, tablet.path(), API_KEY)).unwrap();

    let stats = engine.run_pass().await.unwrap();
    assert_eq!(stats.documents_present, 0);
    assert_eq!(stats.files_transferred, 1);
}

#[tokio::test]
async fn test_rejected_api_key_fails_pass() {
    let mock = spawn_mock(StatusCode::OK).await;
    let tablet = tablet_with_folders(&["Papers"]);
    let engine = build_http_engine(&config_for(&mock, tablet.path(), "wrong-key")).unwrap();

    let result = engine.run_pass().await;
    assert!(matches!(
        result,
        Err(CoreError::Remote(RemoteRequestError::AuthenticationFailed { status: 403, .. }))
    ));
    assert!(mock.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_download_is_not_uploaded() {
    let mock = spawn_mock(StatusCode::OK).await;
    let tablet = tablet_with_folders(&["Broken"]);
    let engine = build_http_engine(&config_for(&mock, tablet.path(), API_KEY)).unwrap();

    let result = engine.run_pass().await;
    assert!(matches!(
        result,
        Err(CoreError::Transfer(TransferError::DownloadStatus { status: 404, .. }))
    ));
    assert!(mock.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_upload_fails_pass() {
    let mock = spawn_mock(StatusCode::INTERNAL_SERVER_ERROR).await;
    let tablet = tablet_with_folders(&["Papers"]);
    let engine = build_http_engine(&config_for(&mock, tablet.path(), API_KEY)).unwrap();

    let result = engine.run_pass().await;
    assert!(matches!(
        result,
        Err(CoreError::Transfer(TransferError::UploadStatus { status: 500, .. }))
    ));
}

#[tokio::test]
async fn test_missing_library_fails_pass() {
    let mock = spawn_mock(StatusCode::OK).await;
    let tablet = TempDir::new().unwrap();
    let gone = tablet.path().join("not-there");
    let mut config = config_for(&mock, tablet.path(), API_KEY);
    config.tablet.library_dir = gone;
    let engine = build_http_engine(&config).unwrap();

    assert!(matches!(engine.run_pass().await, Err(CoreError::LocalRead(_))));
}

#[tokio::test]
async fn test_stalled_download_times_out() {
    let mock = spawn_mock(StatusCode::OK).await;
    let tablet = tablet_with_folders(&["Slow"]);
    let mut config = config_for(&mock, tablet.path(), API_KEY);
    config.http.request_timeout_secs = 1;
    let engine = build_http_engine(&config).unwrap();

    let started = Instant::now();
    let result = engine.run_pass().await;
    let elapsed = started.elapsed();

    match result {
        Err(CoreError::Transfer(TransferError::Download { ref url, ref source })) => {
            assert!(url.ends_with("/slow/slow.pdf"), "url: {url}");
            assert!(source.is_timeout(), "source: {source}");
        }
        other => panic!("expected a download timeout, got {other:?}"),
    }
    assert!(elapsed < STALL, "pass took {elapsed:?}");
    assert!(mock.uploads.lock().unwrap().is_empty());
    assert!(mock.downloads.lock().unwrap().is_empty());
}
