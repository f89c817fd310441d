//! Product record and its variant collection

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::variant::Variant;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// `None` for a draft that has not been saved
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "emporium_api::ids::opaque_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub total_stock: u64,
    /// Insertion order
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            total_stock: 0,
            variants: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Append a blank variant and return its index.
    ///
    /// Only the first variant of an empty collection starts as default.
    pub fn add_variant(&mut self) -> usize {
        let is_default = self.variants.is_empty();
        self.variants.push(Variant::blank(is_default));
        self.variants.len() - 1
    }

    pub fn variant(&self, index: usize) -> Result<&Variant> {
        self.variants
            .get(index)
            .ok_or(CatalogError::IndexOutOfRange(index))
    }

    pub fn variant_mut(&mut self, index: usize) -> Result<&mut Variant> {
        self.variants
            .get_mut(index)
            .ok_or(CatalogError::IndexOutOfRange(index))
    }

    pub fn position_of(&self, variant_id: &str) -> Option<usize> {
        self.variants.iter().position(|v| v.has_id(variant_id))
    }

    /// Remove the variant at `index`, promoting the first remaining variant
    /// when the removed one was the only default.
    pub fn remove_variant_at(&mut self, index: usize) -> Result<Variant> {
        if index >= self.variants.len() {
            return Err(CatalogError::IndexOutOfRange(index));
        }
        let removed = self.variants.remove(index);

        if removed.is_default && !self.variants.iter().any(|v| v.is_default) {
            if let Some(first) = self.variants.first_mut() {
                first.is_default = true;
                tracing::debug!(sku = %first.sku, "Promoted default variant");
            }
        }

        self.recompute_total_stock();
        Ok(removed)
    }

    pub fn stock_sum(&self) -> u64 {
        self.variants.iter().map(|v| v.stock).sum()
    }

    /// Keep `total_stock` equal to the sum of variant stocks.
    pub fn recompute_total_stock(&mut self) {
        self.total_stock = self.stock_sum();
    }
}

/// Which product a local edit targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductKey {
    /// The unsaved product being composed
    Draft,
    Persisted(String),
}

impl ProductKey {
    pub fn persisted(id: impl Into<String>) -> Self {
        ProductKey::Persisted(id.into())
    }
}

impl std::fmt::Display for ProductKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductKey::Draft => write!(f, "draft"),
            ProductKey::Persisted(id) => write!(f, "{}", id),
        }
    }
}

/// `data` of the product list endpoint: a bare list or `{ products: [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductListPayload {
    Wrapped { products: Vec<Product> },
    List(Vec<Product>),
}

impl ProductListPayload {
    pub fn into_products(self) -> Vec<Product> {
        match self {
            ProductListPayload::Wrapped { products } => products,
            ProductListPayload::List(products) => products,
        }
    }
}

/// `data` of the single product endpoints: `{ product: {...} }` or the record itself
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ProductPayload {
    Wrapped { product: Product },
    Bare(Product),
}

impl ProductPayload {
    pub fn into_product(self) -> Product {
        match self {
            ProductPayload::Wrapped { product } => product,
            ProductPayload::Bare(product) => product,
        }
    }
}
