use emporium_api::TransportError;
use url::Url;

use crate::Result;

/// Catalog collection URLs; record URLs are built per id.
#[derive(Debug, Clone)]
pub struct CatalogEndpoints {
    products: Url,
    variants: Url,
}

impl CatalogEndpoints {
    pub fn new(
        base: &Url,
        products_path: &str,
        variants_path: &str,
    ) -> std::result::Result<Self, url::ParseError> {
        Ok(Self {
            products: base.join(products_path)?,
            variants: base.join(variants_path)?,
        })
    }

    /// `/api/products` and `/api/variants` under `base`.
    pub fn from_base(base: &Url) -> std::result::Result<Self, url::ParseError> {
        Self::new(base, "/api/products", "/api/variants")
    }

    pub fn products(&self) -> Url {
        self.products.clone()
    }

    pub fn product(&self, id: &str) -> Result<Url> {
        with_segments(&self.products, &[id])
    }

    pub fn variant(&self, id: &str) -> Result<Url> {
        with_segments(&self.variants, &[id])
    }

    pub fn variant_images(&self, id: &str) -> Result<Url> {
        with_segments(&self.variants, &[id, "images"])
    }
}

/// Append percent-encoded path segments.
fn with_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| TransportError::Request(format!("cannot extend URL {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
