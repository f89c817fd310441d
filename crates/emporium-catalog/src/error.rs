//! Catalog error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Transport error: {0}")]
    Transport(#[from] emporium_api::TransportError),

    /// Non-2xx answer or failure envelope; `message` is the server's text.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Payload error: {0}")]
    Payload(#[from] emporium_api::PayloadError),

    #[error("Session expired, log in again")]
    Unauthenticated,

    #[error("Variant has not been saved yet")]
    UnsavedVariant,

    #[error("Variant {0} is saved; delete it through the store")]
    PersistedVariant(String),

    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("No variant at index {0}")]
    IndexOutOfRange(usize),

    #[error("Invalid value for {field}: {value:?}")]
    InvalidField { field: String, value: String },

    #[error("Variant {0} already has an operation in flight")]
    Busy(String),

    #[error("No deletion is waiting for confirmation")]
    NoPendingDeletion,

    #[error("No draft product is being composed")]
    NoDraft,

    #[error("Workstation has been disposed")]
    Disposed,
}
