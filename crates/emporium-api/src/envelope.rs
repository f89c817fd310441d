//! `{ success, data, message }` envelope validation
//!
//! Every JSON endpoint answers with this envelope. It is checked here, at the
//! network boundary, so nothing past this point sees a half-shaped payload.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::PayloadError;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome<T> {
    Success(T),
    Failure { message: Option<String> },
}

impl<T> ApiOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            ApiOutcome::Success(data) => Some(data),
            ApiOutcome::Failure { .. } => None,
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse a response body into an [`ApiOutcome`].
///
/// A success envelope without `data` decodes `T` from `null`, which works for
/// `Option<_>`, `()` and `IgnoredAny` and fails for record types.
pub fn parse_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<ApiOutcome<T>, PayloadError> {
    let raw: RawEnvelope =
        serde_json::from_slice(body).map_err(|e| PayloadError::Malformed(e.to_string()))?;

    if !raw.success {
        return Ok(ApiOutcome::Failure {
            message: raw.message,
        });
    }

    let data = raw.data.unwrap_or(serde_json::Value::Null);
    let data = serde_json::from_value(data).map_err(|e| PayloadError::Malformed(e.to_string()))?;
    Ok(ApiOutcome::Success(data))
}
