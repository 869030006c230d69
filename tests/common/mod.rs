#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gpt_relay::{router, AppState, CompletionClient, CompletionError, ContextStore, ContextText};
use serde_json::{json, Value};

pub const FIXTURE_CONTEXT: &str = "tests/fixtures/context.jsonl";

/// Build a chat-completions response body with a single choice.
pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21 }
    })
}

/// Completion client stub that records calls and replays a fixed outcome.
pub struct StubClient {
    reply: Box<dyn Fn() -> Result<String, CompletionError> + Send + Sync>,
    calls: AtomicUsize,
    last: Mutex<Option<(String, String)>>,
}

impl StubClient {
    pub fn replying(reply: &str) -> Arc<Self> {
        let reply = reply.to_string();
        Self::with(move || Ok(reply.trim().to_string()))
    }

    pub fn failing(make: impl Fn() -> CompletionError + Send + Sync + 'static) -> Arc<Self> {
        Self::with(move || Err(make()))
    }

    fn with(
        reply: impl Fn() -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The context and prompt of the most recent call.
    pub fn last_call(&self) -> Option<(String, String)> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CompletionClient for StubClient {
    async fn complete(
        &self,
        context: &ContextText,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((context.to_string(), prompt.to_string()));
        (self.reply)()
    }
}

/// Serve the router on an ephemeral port and return its base URL.
pub async fn spawn_app(client: Arc<dyn CompletionClient>, context: ContextStore) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr: SocketAddr = listener.local_addr().unwrap();
    let app = router(AppState::new(client, context));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}
