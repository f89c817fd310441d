//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] emporium_api::TransportError),

    #[error("Payload error: {0}")]
    Payload(#[from] emporium_api::PayloadError),

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Email and password are required")]
    EmptyCredentials,

    #[error("Session manager has been disposed")]
    Disposed,
}
