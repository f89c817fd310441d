//! HTTP transport seam and its reqwest implementation

use async_trait::async_trait;
use std::time::Duration;

use crate::error::TransportError;
use crate::request::{ApiRequest, Headers, Method, RequestBody};
use crate::response::ApiResponse;
use crate::Result;

/// Sends one request and returns whatever the server answered.
///
/// Non-2xx statuses are responses, not errors; only failures to complete the
/// exchange are `Err`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport with a persistent cookie jar.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Use a preconfigured client (it should keep a cookie store for sessions to work).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpClient for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let label = request.describe();
        let ApiRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let is_multipart = matches!(body, RequestBody::Multipart { .. });
        let mut builder = self.client.request(reqwest_method(method), url);

        for (name, value) in headers.iter() {
            if is_multipart && name == "content-type" {
                continue;
            }
            builder = builder.header(name, value);
        }

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart { field, files } => {
                let mut form = reqwest::multipart::Form::new();
                for file in files {
                    let part = reqwest::multipart::Part::bytes(file.bytes)
                        .file_name(file.file_name)
                        .mime_str(&file.content_type)?;
                    form = form.part(field.clone(), part);
                }
                builder.multipart(form)
            }
        };

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(request = %label, error = %e, "HTTP request failed");
            TransportError::from(e)
        })?;

        let status = response.status().as_u16();
        let mut response_headers = Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                response_headers.insert(name.as_str(), value);
            }
        }
        let body = response.bytes().await?.to_vec();

        tracing::debug!(request = %label, status, bytes = body.len(), "HTTP exchange");

        Ok(ApiResponse::new(status, body).with_headers(response_headers))
    }
}
