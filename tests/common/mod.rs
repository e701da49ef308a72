//! Shared test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    routing::post,
};
use campus_voice::Config;
use campus_voice::config::file::CampusConfigFile;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// A request the fake upstream received
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub subscription_key: Option<String>,
    pub body: Value,
}

/// Canned chat-completion and TTS upstream on a local port
pub struct FakeUpstream {
    pub base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeUpstream {
    /// Requests received so far
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Last request received on `path`
    pub fn last(&self, path: &str) -> Recorded {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.path == path)
            .unwrap_or_else(|| panic!("no request on {path}"))
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn canned(path: &'static str, reply: (StatusCode, Value), log: Arc<Mutex<Vec<Recorded>>>) -> axum::routing::MethodRouter {
    post(move |headers: HeaderMap, Json(body): Json<Value>| {
        let reply = reply.clone();
        let log = log.clone();
        async move {
            log.lock().unwrap().push(Recorded {
                path: path.to_string(),
                authorization: header(&headers, "authorization"),
                subscription_key: header(&headers, "api-subscription-key"),
                body,
            });
            (reply.0, Json(reply.1))
        }
    })
}

/// Start a fake upstream answering `/chat` and `/tts` with fixed replies
pub async fn spawn_upstream(chat: (StatusCode, Value), tts: (StatusCode, Value)) -> FakeUpstream {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/chat", canned("/chat", chat, requests.clone()))
        .route("/tts", canned("/tts", tts, requests.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeUpstream {
        base: format!("http://{addr}"),
        requests,
    }
}

/// Completion body with a single answer
pub fn completion(content: &str) -> (StatusCode, Value) {
    (
        StatusCode::OK,
        serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }),
    )
}

/// Configuration pointing at a fake upstream, with test keys unless `keys` is false
pub fn test_config(upstream: &FakeUpstream, keys: bool) -> Config {
    let mut env = HashMap::from([
        ("CHAT_API_URL".to_string(), format!("{}/chat", upstream.base)),
        ("SARVAM_TTS_URL".to_string(), format!("{}/tts", upstream.base)),
    ]);
    if keys {
        env.insert("CHAT_API_KEY".to_string(), "test-chat-key".to_string());
        env.insert("SARVAM_API_KEY".to_string(), "test-sarvam-key".to_string());
    }
    Config::from_sources(CampusConfigFile::default(), move |key| env.get(key).cloned())
}

/// POST a JSON body to the router and decode the JSON reply
pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Serve a router on a local port and return its base URL
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Accept connections and never answer; returns the base URL
pub async fn silent_gateway() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}
