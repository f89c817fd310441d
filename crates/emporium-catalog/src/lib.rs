//! Emporium catalog
//!
//! Products, their variants and the workstation that edits them against the
//! remote store.

mod attribute;
mod client;
mod confirmation;
mod endpoints;
mod error;
mod images;
mod product;
mod variant;
mod workstation;

pub use attribute::AttributeValue;
pub use client::CatalogClient;
pub use confirmation::{DeleteOutcome, PendingDeletion};
pub use endpoints::CatalogEndpoints;
pub use error::CatalogError;
pub use images::PendingImage;
pub use product::{Product, ProductKey};
pub use variant::{Variant, VariantEdit, VariantField};
pub use workstation::VariantWorkstation;

pub type Result<T> = std::result::Result<T, CatalogError>;
