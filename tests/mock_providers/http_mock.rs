//! Recording HTTP transport
//!
//! Captures URL, headers and body of every POST and answers with a scripted
//! reply, optionally after a delay. Honours the cancellation token the same
//! way the reqwest implementation does.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use lingo_gateway::core::http::HttpService;
use lingo_gateway::errors::HttpError;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }
}

#[derive(Debug, Clone)]
pub enum MockReply {
    Body(Bytes),
    Status(u16, String),
    Transport(String),
}

pub struct MockHttp {
    reply: Mutex<MockReply>,
    delay: Duration,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockHttp {
    /// Answer every call with `body`
    pub fn responding(body: impl Into<Bytes>) -> Self {
        Self::with_reply(MockReply::Body(body.into()))
    }

    pub fn with_reply(reply: MockReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Hold every response for `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_reply(&self, reply: MockReply) {
        *self.reply.lock() = reply;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl HttpService for MockHttp {
    async fn post(
        &self,
        url: &str,
        body: &Value,
        headers: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<Bytes, HttpError> {
        self.calls.lock().push(RecordedCall {
            url: url.to_string(),
            headers: headers.clone(),
            body: body.clone(),
        });

        if !self.delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HttpError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        let reply = self.reply.lock().clone();
        match reply {
            MockReply::Body(bytes) => Ok(bytes),
            MockReply::Status(status, body) => Err(HttpError::Status { status, body }),
            MockReply::Transport(msg) => Err(HttpError::Transport(msg)),
        }
    }
}
