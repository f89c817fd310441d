//! Emporium API plumbing
//!
//! Everything the console needs to talk to the remote store:
//! - A transport seam (`HttpClient`) with a reqwest implementation
//! - Request/response types and the `{ success, data, message }` envelope
//! - The `RequestExecutor` seam feature modules issue calls through
//! - The navigation seam used for full-page redirects
//!
//! All requests share one cookie jar, so credentials ride along on every call.

mod envelope;
mod error;
mod executor;
pub mod ids;
mod lifecycle;
mod navigator;
mod request;
mod response;
mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use envelope::{parse_envelope, ApiOutcome};
pub use error::{PayloadError, TransportError};
pub use executor::RequestExecutor;
pub use lifecycle::Liveness;
pub use navigator::{ChannelNavigator, Navigator};
pub use request::{ApiRequest, FilePart, Headers, Method, RequestBody};
pub use response::ApiResponse;
pub use transport::{HttpClient, ReqwestTransport};

pub type Result<T> = std::result::Result<T, TransportError>;
