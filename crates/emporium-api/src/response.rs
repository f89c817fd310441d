//! Response returned by a transport

use serde::de::DeserializeOwned;

use crate::envelope::{parse_envelope, ApiOutcome};
use crate::error::{PayloadError, TransportError};
use crate::request::Headers;

#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type", "application/json");
        Self {
            status,
            headers,
            body: value.to_string().into_bytes(),
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Validate the body as a `{ success, data, message }` envelope.
    pub fn outcome<T: DeserializeOwned>(&self) -> Result<ApiOutcome<T>, PayloadError> {
        parse_envelope(&self.body)
    }

    /// Best human-readable message for a failed response.
    ///
    /// Prefers a `message` (or string `error`) field from a JSON body, then
    /// the raw body text, then the bare status.
    pub fn error_message(&self) -> String {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.body) {
            for key in ["message", "error"] {
                if let Some(message) = value.get(key).and_then(|m| m.as_str()) {
                    if !message.trim().is_empty() {
                        return message.to_string();
                    }
                }
            }
        }

        let text = self.text();
        let text = text.trim();
        if text.is_empty() {
            format!("HTTP {}", self.status)
        } else {
            text.to_string()
        }
    }
}
