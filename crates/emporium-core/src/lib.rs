//! Emporium Core
//!
//! Composition layer for the storefront/admin console: configuration, the
//! `Console` that wires the session manager to the variant workstation, and
//! the command functions the rendering layer calls.

pub mod commands;
mod config;
mod console;
mod error;
mod state;

pub use config::{Config, EndpointPaths};
pub use console::Console;
pub use error::CoreError;
pub use state::AppState;

// Re-export the feature crates
pub use emporium_api::{ApiRequest, ApiResponse, HttpClient, Navigator, TransportError};
pub use emporium_catalog::{
    AttributeValue, CatalogError, DeleteOutcome, PendingDeletion, PendingImage, Product,
    ProductKey, Variant, VariantEdit, VariantField, VariantWorkstation,
};
pub use emporium_session::{
    LoginCredentials, SessionError, SessionManager, SessionPhase, SessionSnapshot, User,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
