#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use awsjson_http::{AwsClient, ClientOptions, Credentials};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Router,
};
use serde_json::Value as JsonValue;

pub const ACCESS_KEY: &str = "AKIDEXAMPLE";

#[derive(Clone)]
pub struct MockResponse {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn raw(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::from_millis(0),
        }
    }

    pub fn json(status: StatusCode, body: JsonValue) -> Self {
        Self::raw(status, body.to_string())
    }

    pub fn error(status: StatusCode, kind: &str, message: &str) -> Self {
        Self::json(
            status,
            serde_json::json!({ "__type": kind, "message": message }),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One request as the mock server saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Captured {
    pub authorization: Option<String>,
    pub date: Option<String>,
    pub target: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    fallback: MockResponse,
    hits: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<Captured>>>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

async fn handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state
        .captured
        .lock()
        .expect("capture mutex must not be poisoned")
        .push(Captured {
            authorization: header(&headers, "authorization"),
            date: header(&headers, "x-amz-date"),
            target: header(&headers, "x-amz-target"),
            content_type: header(&headers, "content-type"),
            body,
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| state.fallback.clone())
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (response.status, response.body)
}

pub struct TestServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    captured: Arc<Mutex<Vec<Captured>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.captured
            .lock()
            .expect("capture mutex must not be poisoned")
            .clone()
    }
}

/// Serves `responses` in order, then `fallback` forever.
pub async fn spawn_server(responses: Vec<MockResponse>, fallback: MockResponse) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        fallback,
        hits: Arc::new(AtomicUsize::new(0)),
        captured: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new().fallback(handler).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        captured: state.captured,
        task,
    }
}

/// Always answers with `response`.
pub async fn spawn_fixed(response: MockResponse) -> TestServer {
    spawn_server(Vec::new(), response).await
}

pub fn fast_options() -> ClientOptions {
    ClientOptions {
        timeout_ms: 1_000,
        max_attempts: 5,
        retry_backoff_ms: 1,
        retry_timeouts: false,
    }
}

pub fn test_client() -> AwsClient {
    AwsClient::new(Credentials::new(ACCESS_KEY, "test-secret-key"), "us-east-1")
        .with_options(fast_options())
}
