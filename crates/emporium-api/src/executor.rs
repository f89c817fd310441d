//! Request executor seam
//!
//! Feature modules never hold a transport directly. They issue calls through
//! an executor, which may add session handling (refresh-and-retry) on top.

use async_trait::async_trait;

use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::Result;

#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// `Ok(None)` means the request was abandoned (for example the session
    /// expired and the user is being sent to log in): there is no response to
    /// process.
    async fn execute(&self, request: ApiRequest) -> Result<Option<ApiResponse>>;
}
