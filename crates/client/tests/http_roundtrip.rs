//! The reqwest clients against an in-process axum server.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use ot_client::{
    CopilotClient, CopilotRequest, DatasetUploader, HttpCopilot, HttpTransport, HttpUploader,
    StreamTransport, TurnRequest,
};
use ot_domain::config::AgentConfig;
use ot_domain::Error;

const SSE: &str = concat!(
    "data: {\"type\":\"step\",\"id\":\"plan\",\"title\":\"Planning Analysis\",\"status\":\"running\"}\n\n",
    "data: {\"type\":\"token\",\"content\":\"Distribusi normal \u{1F642}\"}\n\n",
    "data: {\"type\":\"done\"}\n\n",
);

#[derive(Default)]
struct Seen {
    uploads: AtomicUsize,
    last_stream_body: Mutex<Option<Value>>,
}

async fn stream(State(seen): State<Arc<Seen>>, Json(body): Json<Value>) -> Response {
    *seen.last_stream_body.lock().unwrap() = Some(body);
    // Split inside the emoji and inside a delimiter.
    let bytes = SSE.as_bytes();
    let emoji = SSE.find('\u{1F642}').unwrap() + 2;
    let delim = SSE.find("\n\n").unwrap() + 1;
    let cuts = [0, delim, emoji, bytes.len()];
    let chunks: Vec<Result<Bytes, Infallible>> = cuts
        .windows(2)
        .map(|w| Ok(Bytes::copy_from_slice(&bytes[w[0]..w[1]])))
        .collect();
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(futures_util::stream::iter(chunks)))
        .unwrap()
}

async fn broken_stream() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "agent crashed")
}

async fn upload(State(seen): State<Arc<Seen>>, headers: HeaderMap, body: Bytes) -> Json<Value> {
    seen.uploads.fetch_add(1, Ordering::SeqCst);
    let ctype = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let text = String::from_utf8_lossy(&body);
    if !ctype.starts_with("multipart/form-data")
        || !text.contains("filename=\"dataset.csv\"")
        || !text.contains("name=\"session_id\"")
    {
        return Json(json!({"error": "No file part"}));
    }
    Json(json!({
        "status": "success",
        "file_path": "/tmp/uploads/conv-1/dataset.csv",
        "session_id": "conv-1",
        "filename": "dataset.csv",
    }))
}

async fn rejecting_upload() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, Json(json!({"error": "No selected file"})))
}

async fn copilot(Json(body): Json<Value>) -> Json<Value> {
    if body["message"] == "fail" {
        return Json(json!({"error": "model unavailable"}));
    }
    Json(json!({
        "text": format!("echo: {}", body["message"].as_str().unwrap_or_default()),
        "suggested_actions": [{"label": "Run t-test", "action": "run_analysis"}],
    }))
}

async fn start() -> (SocketAddr, Arc<Seen>) {
    let seen = Arc::new(Seen::default());
    let app = Router::new()
        .route("/api/agent/stream", post(stream))
        .route("/broken/stream", post(broken_stream))
        .route("/api/agent/upload", post(upload))
        .route("/broken/upload", post(rejecting_upload))
        .route("/api/assistant/chat/copilot", post(copilot))
        .with_state(Arc::clone(&seen));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn config(addr: SocketAddr) -> AgentConfig {
    AgentConfig {
        base_url: format!("http://{addr}"),
        ..AgentConfig::default()
    }
}

#[tokio::test]
async fn stream_delivers_all_bytes() {
    let (addr, seen) = start().await;
    let transport = HttpTransport::new(&config(addr)).unwrap();
    let request = TurnRequest {
        message: "Apakah data normal?".into(),
        dataset_path: Some("/tmp/uploads/conv-1/dataset.csv".into()),
    };

    let mut source = transport.open(&request).await.unwrap();
    let mut received = Vec::new();
    while let Some(chunk) = source.next_chunk().await.unwrap() {
        received.extend_from_slice(&chunk);
    }
    assert_eq!(String::from_utf8(received).unwrap(), SSE);

    let body = seen.last_stream_body.lock().unwrap().take().unwrap();
    assert_eq!(body["message"], "Apakah data normal?");
    assert_eq!(body["dataset_path"], "/tmp/uploads/conv-1/dataset.csv");
}

#[tokio::test]
async fn stream_folds_into_message() {
    let (addr, _) = start().await;
    let transport = HttpTransport::new(&config(addr)).unwrap();
    let mut source = transport
        .open(&TurnRequest {
            message: "hi".into(),
            dataset_path: None,
        })
        .await
        .unwrap();

    let mut fold = ot_protocol::MessageFold::new(ot_domain::Message::assistant_placeholder(), "data: ");
    while let Some(chunk) = source.next_chunk().await.unwrap() {
        fold.feed(&chunk);
    }
    fold.finish();
    assert!(fold.is_done());
    assert_eq!(fold.message().content, "Distribusi normal \u{1F642}");
    assert_eq!(fold.message().steps[0].id, "plan");
}

#[tokio::test]
async fn error_status_is_open_failure() {
    let (addr, _) = start().await;
    let cfg = AgentConfig {
        stream_path: "/broken/stream".into(),
        ..config(addr)
    };
    let transport = HttpTransport::new(&cfg).unwrap();
    let err = match transport
        .open(&TurnRequest {
            message: "x".into(),
            dataset_path: None,
        })
        .await
    {
        Ok(_) => panic!("expected open failure"),
        Err(e) => e,
    };
    assert!(matches!(err, Error::TransportOpen(ref m) if m.contains("agent crashed")));
}

#[tokio::test]
async fn unreachable_server_is_open_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(&config(addr)).unwrap();
    let result = transport
        .open(&TurnRequest {
            message: "x".into(),
            dataset_path: None,
        })
        .await;
    assert!(matches!(result, Err(Error::TransportOpen(_))));
}

#[tokio::test]
async fn upload_returns_handle() {
    let (addr, seen) = start().await;
    let uploader = HttpUploader::new(&config(addr)).unwrap();
    let handle = uploader
        .upload("conv-1", "score\n71.5\n80".into())
        .await
        .unwrap();
    assert_eq!(handle.path, "/tmp/uploads/conv-1/dataset.csv");
    assert_eq!(seen.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upload_rejection_is_upload_error() {
    let (addr, _) = start().await;
    let cfg = AgentConfig {
        upload_path: "/broken/upload".into(),
        ..config(addr)
    };
    let uploader = HttpUploader::new(&cfg).unwrap();
    let err = uploader.upload("conv-1", "a\n1".into()).await.unwrap_err();
    assert!(matches!(err, Error::Upload(ref m) if m.contains("No selected file")));
    assert!(!err.is_fatal_to_turn());
}

#[tokio::test]
async fn copilot_reply_and_error() {
    let (addr, _) = start().await;
    let client = HttpCopilot::new(&config(addr)).unwrap();

    let reply = client.ask(&CopilotRequest::new("outline")).await.unwrap();
    assert_eq!(reply.text, "echo: outline");
    assert_eq!(reply.suggested_actions[0].action, "run_analysis");

    let err = client.ask(&CopilotRequest::new("fail")).await.unwrap_err();
    assert!(err.to_string().contains("model unavailable"));
}
