//! Emporium Session Management
//!
//! The console's belief about who is logged in:
//! - Validates the session once on mount, failing closed
//! - Refreshes an expired session once and retries the call that hit 401
//! - Concurrent refreshes share a single in-flight attempt
//! - Logout always succeeds locally and sends the user to the login page

mod endpoints;
mod error;
mod manager;
mod state;
mod user;

pub use endpoints::SessionEndpoints;
pub use error::SessionError;
pub use manager::SessionManager;
pub use state::{SessionEvent, SessionPhase, SessionSnapshot};
pub use user::{LoginCredentials, User};

pub type Result<T> = std::result::Result<T, SessionError>;
