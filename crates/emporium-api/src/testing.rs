//! Scripted collaborators for tests
//!
//! `ScriptedTransport` answers by `(method, path)`. Queued answers are used in
//! order and the last one repeats, so a route scripted once answers forever.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::TransportError;
use crate::executor::RequestExecutor;
use crate::navigator::Navigator;
use crate::request::{ApiRequest, Headers, Method};
use crate::response::ApiResponse;
use crate::transport::HttpClient;
use crate::Result;

#[derive(Debug, Clone)]
enum Scripted {
    Respond(ApiResponse),
    Fail(String),
}

#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend every exchange for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, method: Method, path: &str, response: ApiResponse) -> &Self {
        self.push(method, path, Scripted::Respond(response))
    }

    pub fn respond_json(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: serde_json::Value,
    ) -> &Self {
        self.respond(method, path, ApiResponse::json_body(status, &body))
    }

    /// Script a network-level failure.
    pub fn fail(&self, method: Method, path: &str, message: &str) -> &Self {
        self.push(method, path, Scripted::Fail(message.to_string()))
    }

    fn push(&self, method: Method, path: &str, answer: Scripted) -> &Self {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(answer);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url.path() == path)
            .count()
    }

    fn next_answer(&self, method: Method, path: &str) -> Option<Scripted> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(&(method, path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method;
        let path = request.url.path().to_string();
        self.requests.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_answer(method, &path) {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(TransportError::Network(message)),
            None => Err(TransportError::Network(format!(
                "no scripted answer for {method} {path}"
            ))),
        }
    }
}

#[async_trait]
impl RequestExecutor for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Option<ApiResponse>> {
        let request = request.with_default_headers(&Headers::json_defaults());
        Ok(Some(self.send(request).await?))
    }
}

/// Records every redirect instead of navigating.
#[derive(Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.redirects.lock().len()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, destination: &str) {
        self.redirects.lock().push(destination.to_string());
    }
}
