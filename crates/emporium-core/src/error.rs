//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Transport error: {0}")]
    Transport(#[from] emporium_api::TransportError),

    #[error("Session error: {0}")]
    Session(#[from] emporium_session::SessionError),

    #[error("{0}")]
    Catalog(#[from] emporium_catalog::CatalogError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Console not initialized")]
    NotInitialized,
}
