//! Mock HTTP tests for VeoClient.
//!
//! These tests cover:
//! - Request formatting for submit and poll
//! - Permission error classification
//! - The fixed-interval poll loop and its progress messages
//! - Video download status handling and key redaction

use std::time::Duration;

use tempfile::TempDir;
use veo_studio::state::{event_channel, EventReceiver, GenerationEvent, UserMessage};
use veo_studio::veo::{
    AspectRatio, AudioAmbience, CyclingMessages, GenerationOptions, ImagePayload, Operation,
    Resolution, VeoClient, VeoError, DEFAULT_MODEL,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-api-key";
const OPERATION_NAME: &str = "models/veo-3.1-fast-generate-preview/operations/op-123";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

fn submit_path() -> String {
    format!("/v1beta/models/{}:predictLongRunning", DEFAULT_MODEL)
}

fn poll_path() -> String {
    format!("/v1beta/{}", OPERATION_NAME)
}

fn test_client(server: &MockServer) -> VeoClient {
    VeoClient::with_base_url(API_KEY.to_string(), server.uri())
        .expect("Failed to create test client")
        .with_poll_interval(Duration::from_millis(10))
}

fn test_image() -> ImagePayload {
    ImagePayload::from_bytes(PNG_BYTES.to_vec(), Some("png")).unwrap()
}

fn pending_operation() -> serde_json::Value {
    serde_json::json!({"name": OPERATION_NAME})
}

fn completed_operation(video_uri: &str) -> serde_json::Value {
    serde_json::json!({
        "name": OPERATION_NAME,
        "done": true,
        "response": {
            "generateVideoResponse": {
                "generatedSamples": [{"video": {"uri": video_uri}}]
            }
        }
    })
}

fn drain(mut rx: EventReceiver) -> Vec<GenerationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// === Submit ===

#[tokio::test]
async fn test_submit_sends_key_header_and_parameters() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(submit_path()))
        .and(header("x-goog-api-key", API_KEY))
        .and(body_partial_json(serde_json::json!({
            "instances": [{
                "prompt": "make it move",
                "image": {"mimeType": "image/png", "bytesBase64Encoded": test_image().to_base64()}
            }],
            "parameters": {"aspectRatio": "9:16", "resolution": "1080p"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let operation = client
        .submit(
            &test_image(),
            "make it move",
            AspectRatio::Portrait,
            Resolution::FullHd,
        )
        .await
        .unwrap();

    assert_eq!(operation.name, OPERATION_NAME);
    assert!(!operation.done);
}

#[tokio::test]
async fn test_submit_permission_denied_gives_billing_hint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(submit_path()))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "code": 403,
                "message": "The caller does not have permission",
                "status": "PERMISSION_DENIED"
            }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client
        .submit(&test_image(), "p", AspectRatio::Landscape, Resolution::Hd)
        .await;

    let err = result.unwrap_err();
    assert!(
        matches!(err, VeoError::PermissionDenied { .. }),
        "Expected PermissionDenied, got {:?}",
        err
    );
    assert!(err.is_permission_problem());
    let text = err.to_string();
    assert!(text.contains("The caller does not have permission"));
    assert!(text.contains("billing"));
}

#[tokio::test]
async fn test_submit_entity_not_found_is_permission_problem() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(submit_path()))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;

    let result = test_client(&server)
        .submit(&test_image(), "p", AspectRatio::Landscape, Resolution::Hd)
        .await;

    assert!(matches!(result, Err(VeoError::PermissionDenied { .. })));
}

#[tokio::test]
async fn test_submit_other_error_is_surfaced_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(submit_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server)
        .await;

    let result = test_client(&server)
        .submit(&test_image(), "p", AspectRatio::Landscape, Resolution::Hd)
        .await;

    match result {
        Err(VeoError::ApiError { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("backend exploded"));
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

// === Poll ===

#[tokio::test]
async fn test_poll_requests_operation_by_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(poll_path()))
        .and(header("x-goog-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .expect(1)
        .mount(&server)
        .await;

    let operation: Operation = serde_json::from_value(pending_operation()).unwrap();
    let updated = test_client(&server).poll(&operation).await.unwrap();
    assert!(!updated.done);
}

#[tokio::test]
async fn test_wait_for_completion_emits_one_message_per_pending_iteration() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(poll_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(poll_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completed_operation("https://example.com/v.mp4")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (tx, rx) = event_channel();
    let mut messages = CyclingMessages::new(vec!["first".to_string(), "second".to_string()]);
    let start: Operation = serde_json::from_value(pending_operation()).unwrap();

    let done = test_client(&server)
        .wait_for_completion(start, &mut messages, &tx)
        .await
        .unwrap();
    drop(tx);

    assert!(done.done);
    assert_eq!(done.video_uri(), Some("https://example.com/v.mp4"));
    assert_eq!(
        drain(rx),
        vec![
            GenerationEvent::Progress("first".to_string()),
            GenerationEvent::Progress("second".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_wait_for_completion_already_done_does_not_poll() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (tx, rx) = event_channel();
    let start: Operation =
        serde_json::from_value(completed_operation("https://example.com/v.mp4")).unwrap();

    let done = test_client(&server)
        .wait_for_completion(start, &mut CyclingMessages::default(), &tx)
        .await
        .unwrap();
    drop(tx);

    assert!(done.done);
    assert!(drain(rx).is_empty());
}

#[tokio::test]
async fn test_wait_for_completion_reports_operation_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(poll_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": OPERATION_NAME,
            "done": true,
            "error": {"code": 13, "message": "Internal error during generation"}
        })))
        .mount(&server)
        .await;

    let (tx, _rx) = event_channel();
    let start: Operation = serde_json::from_value(pending_operation()).unwrap();
    let result = test_client(&server)
        .wait_for_completion(start, &mut CyclingMessages::default(), &tx)
        .await;

    match result {
        Err(VeoError::OperationFailed { message }) => {
            assert_eq!(message, "Internal error during generation");
        }
        other => panic!("Expected OperationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wait_for_completion_permission_status_is_permission_denied() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(poll_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": OPERATION_NAME,
            "done": true,
            "error": {"code": 7, "message": "The caller does not have access", "status": "PERMISSION_DENIED"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, _rx) = event_channel();
    let start: Operation = serde_json::from_value(pending_operation()).unwrap();
    let result = test_client(&server)
        .wait_for_completion(start, &mut CyclingMessages::default(), &tx)
        .await;

    match result {
        Err(err @ VeoError::PermissionDenied { .. }) => {
            assert!(err.is_permission_problem());
            assert!(err.to_string().contains("The caller does not have access"));
        }
        other => panic!("Expected PermissionDenied, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wait_for_completion_forbidden_status_check_is_permission_denied() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(poll_path()))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "code": 403,
                "message": "Billing is not enabled for this project.",
                "status": "FAILED_PRECONDITION"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, _rx) = event_channel();
    let start: Operation = serde_json::from_value(pending_operation()).unwrap();
    let result = test_client(&server)
        .wait_for_completion(start, &mut CyclingMessages::default(), &tx)
        .await;

    assert!(matches!(result, Err(VeoError::PermissionDenied { .. })));
}

// === Fetch ===

#[tokio::test]
async fn test_fetch_video_appends_key_and_writes_file() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/files/vid-1:download"))
        .and(query_param("alt", "media"))
        .and(query_param("key", API_KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"fake-mp4-bytes".to_vec())
                .insert_header("content-type", "video/mp4"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("nested").join("video.mp4");
    let uri = format!("{}/v1beta/files/vid-1:download?alt=media", server.uri());

    let written = test_client(&server).fetch_video(&uri, &dest).await.unwrap();

    assert_eq!(written, dest);
    assert_eq!(std::fs::read(&dest).unwrap(), b"fake-mp4-bytes");
}

#[tokio::test]
async fn test_fetch_video_forbidden_has_specific_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/video.mp4"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uri = format!("{}/video.mp4", server.uri());
    let result = test_client(&server)
        .fetch_video(&uri, &dir.path().join("v.mp4"))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, VeoError::Forbidden));
    assert!(err.to_string().contains("forbidden (403)"));
}

#[tokio::test]
async fn test_fetch_video_other_status_includes_status_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/video.mp4"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let uri = format!("{}/video.mp4", server.uri());
    let result = test_client(&server)
        .fetch_video(&uri, &dir.path().join("v.mp4"))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, VeoError::FetchFailed { .. }));
    assert_eq!(
        err.to_string(),
        "Failed to fetch video: 500 Internal Server Error"
    );
}

/// Address of a local port with nothing listening on it.
fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/v1beta/files/vid-1:download?alt=media", port)
}

#[tokio::test]
async fn test_fetch_video_connection_error_does_not_leak_key() {
    let secret = "SUPERSECRETKEY123";
    let client = VeoClient::with_base_url(secret.to_string(), "http://127.0.0.1:1".to_string())
        .unwrap();
    let dir = TempDir::new().unwrap();

    let err = client
        .fetch_video(&closed_port_uri(), &dir.path().join("v.mp4"))
        .await
        .unwrap_err();

    assert!(matches!(err, VeoError::HttpError(_)));
    assert!(!err.to_string().contains(secret));
    assert!(!UserMessage::from_error(&err).text().contains(secret));
    assert!(!format!("{:?}", err).contains(secret));
}

#[tokio::test]
async fn test_fetch_video_truncated_body_removes_partial_file() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises more bytes than it sends, then hangs up.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 1000\r\n\r\npartial-video")
            .await;
        let _ = socket.shutdown().await;
    });

    let secret = "SUPERSECRETKEY123";
    let client = VeoClient::with_base_url(secret.to_string(), format!("http://{}", addr)).unwrap();
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("v.mp4");
    let uri = format!("http://{}/v1beta/files/vid-1:download?alt=media", addr);

    let err = client.fetch_video(&uri, &dest).await.unwrap_err();

    assert!(matches!(err, VeoError::HttpError(_)));
    assert!(!err.to_string().contains(secret));
    assert!(!dest.exists());
}

// === End to end through the client ===

#[tokio::test]
async fn test_generate_completed_without_uri_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(submit_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(pending_operation()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(poll_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": OPERATION_NAME,
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "raiMediaFilteredCount": 1,
                    "raiMediaFilteredReasons": ["The image contains a prominent person"]
                }
            }
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (tx, _rx) = event_channel();
    let options = GenerationOptions {
        ambience: AudioAmbience::Ocean,
        ..Default::default()
    };

    let result = test_client(&server)
        .generate(
            &test_image(),
            &options,
            dir.path(),
            &mut CyclingMessages::default(),
            &tx,
        )
        .await;

    match result {
        Err(VeoError::MissingVideoUri { reasons }) => {
            assert_eq!(reasons, vec!["The image contains a prominent person".to_string()]);
        }
        other => panic!("Expected MissingVideoUri, got {:?}", other),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
