//! Catalog endpoints over a request executor

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::sync::Arc;

use emporium_api::{ApiOutcome, ApiRequest, ApiResponse, FilePart, RequestExecutor};

use crate::endpoints::CatalogEndpoints;
use crate::error::CatalogError;
use crate::product::{Product, ProductListPayload, ProductPayload};
use crate::variant::VariantEdit;
use crate::Result;

/// Form field the image upload endpoint reads files from
const IMAGE_FIELD: &str = "images";

#[derive(Deserialize)]
#[serde(untagged)]
enum UploadPayload {
    Wrapped {
        #[serde(alias = "urls")]
        images: Vec<String>,
    },
    List(Vec<String>),
}

#[derive(Clone)]
pub struct CatalogClient {
    executor: Arc<dyn RequestExecutor>,
    endpoints: CatalogEndpoints,
}

impl CatalogClient {
    pub fn new(executor: Arc<dyn RequestExecutor>, endpoints: CatalogEndpoints) -> Self {
        Self {
            executor,
            endpoints,
        }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let request = ApiRequest::get(self.endpoints.products());
        let payload: ProductListPayload = self.fetch(request).await?;
        Ok(payload.into_products())
    }

    pub async fn get_product(&self, id: &str) -> Result<Product> {
        let request = ApiRequest::get(self.endpoints.product(id)?);
        let payload: ProductPayload = self.fetch(request).await?;
        Ok(payload.into_product())
    }

    pub async fn create_product(&self, product: &Product) -> Result<Product> {
        let request = ApiRequest::post(self.endpoints.products()).with_json(product)?;
        let payload: ProductPayload = self.fetch(request).await?;
        Ok(payload.into_product())
    }

    /// PATCH `{ sku, price, stock }`. The returned record is not used; callers
    /// merge the edit they sent.
    pub async fn update_variant(&self, variant_id: &str, edit: &VariantEdit) -> Result<()> {
        let request = ApiRequest::patch(self.endpoints.variant(variant_id)?).with_json(edit)?;
        self.acknowledge(request).await
    }

    pub async fn delete_variant(&self, variant_id: &str) -> Result<()> {
        let request = ApiRequest::delete(self.endpoints.variant(variant_id)?);
        self.acknowledge(request).await
    }

    /// Upload files and return the URLs the store assigned to them.
    pub async fn upload_variant_images(
        &self,
        variant_id: &str,
        files: Vec<FilePart>,
    ) -> Result<Vec<String>> {
        let request = ApiRequest::post(self.endpoints.variant_images(variant_id)?)
            .with_multipart(IMAGE_FIELD, files);
        let payload: UploadPayload = self.fetch(request).await?;
        Ok(match payload {
            UploadPayload::Wrapped { images } => images,
            UploadPayload::List(images) => images,
        })
    }

    async fn execute(&self, request: ApiRequest) -> Result<(String, ApiResponse)> {
        let label = request.describe();
        let response = self
            .executor
            .execute(request)
            .await?
            .ok_or(CatalogError::Unauthenticated)?;

        if !response.is_success() {
            let message = response.error_message();
            tracing::debug!(request = %label, status = response.status(), %message, "Catalog request rejected");
            return Err(CatalogError::Api {
                status: response.status(),
                message,
            });
        }

        Ok((label, response))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let (label, response) = self.execute(request).await?;
        match response.outcome::<T>()? {
            ApiOutcome::Success(data) => Ok(data),
            ApiOutcome::Failure { message } => Err(failure(&label, &response, message)),
        }
    }

    /// Success status with an empty body, or a success envelope.
    async fn acknowledge(&self, request: ApiRequest) -> Result<()> {
        let (label, response) = self.execute(request).await?;
        if response.body().iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        match response.outcome::<IgnoredAny>()? {
            ApiOutcome::Success(_) => Ok(()),
            ApiOutcome::Failure { message } => Err(failure(&label, &response, message)),
        }
    }
}

fn failure(label: &str, response: &ApiResponse, message: Option<String>) -> CatalogError {
    CatalogError::Api {
        status: response.status(),
        message: message.unwrap_or_else(|| format!("{} failed", label)),
    }
}
