//! Variant Editing Workstation
//!
//! Holds the loaded products and an optional draft behind one lock. Remote
//! mutations are confirm-then-apply: the local record changes only after the
//! store accepted the call, and the change is located by id at that moment so
//! edits to other variants made in the meantime are never overwritten.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use emporium_api::Liveness;

use crate::client::CatalogClient;
use crate::confirmation::{ConfirmationGate, DeleteOutcome, PendingDeletion};
use crate::error::CatalogError;
use crate::images::{PendingImage, PendingImages};
use crate::product::{Product, ProductKey};
use crate::variant::{Variant, VariantEdit, VariantField};
use crate::Result;

#[derive(Default)]
struct WorkstationState {
    products: Vec<Product>,
    draft: Option<Product>,
    pending_images: PendingImages,
    deletion: ConfirmationGate,
    /// Variant ids with a remote call in flight
    in_flight: HashSet<String>,
    /// Product loads and saves in flight
    loading: usize,
}

impl WorkstationState {
    fn product_mut(&mut self, key: &ProductKey) -> Result<&mut Product> {
        match key {
            ProductKey::Draft => self.draft.as_mut().ok_or(CatalogError::NoDraft),
            ProductKey::Persisted(id) => self
                .products
                .iter_mut()
                .find(|p| p.id.as_deref() == Some(id.as_str()))
                .ok_or_else(|| CatalogError::ProductNotFound(id.clone())),
        }
    }

    fn product(&self, key: &ProductKey) -> Result<&Product> {
        match key {
            ProductKey::Draft => self.draft.as_ref().ok_or(CatalogError::NoDraft),
            ProductKey::Persisted(id) => self
                .products
                .iter()
                .find(|p| p.id.as_deref() == Some(id.as_str()))
                .ok_or_else(|| CatalogError::ProductNotFound(id.clone())),
        }
    }

    /// Where a saved variant currently lives
    fn locate(&self, variant_id: &str) -> Option<(ProductKey, usize)> {
        self.products.iter().find_map(|product| {
            let index = product.position_of(variant_id)?;
            let id = product.id.clone()?;
            Some((ProductKey::Persisted(id), index))
        })
    }

    fn upsert(&mut self, product: Product) {
        let existing = product
            .id
            .as_deref()
            .and_then(|id| self.products.iter().position(|p| p.id.as_deref() == Some(id)));
        match existing {
            Some(index) => {
                let old = std::mem::replace(&mut self.products[index], product.clone());
                self.follow_pending_images(&old, Some(&product));
            }
            None => self.products.push(product),
        }
    }

    /// Swap in a freshly loaded product list.
    fn replace_products(&mut self, products: Vec<Product>) {
        let previous = std::mem::replace(&mut self.products, products);
        for old in &previous {
            let replacement = old
                .id
                .as_deref()
                .and_then(|id| self.products.iter().find(|p| p.id.as_deref() == Some(id)))
                .cloned();
            self.follow_pending_images(old, replacement.as_ref());
        }
    }

    /// Re-key pending images from `old`'s variant order to `new`'s by variant
    /// id. Images whose variant is gone are dropped.
    fn follow_pending_images(&mut self, old: &Product, new: Option<&Product>) {
        let Some(id) = old.id.clone() else {
            return;
        };
        let key = ProductKey::Persisted(id);
        let old_ids: Vec<Option<&str>> = old.variants.iter().map(|v| v.id.as_deref()).collect();
        let new_ids: Vec<Option<&str>> = new
            .map(|p| p.variants.iter().map(|v| v.id.as_deref()).collect())
            .unwrap_or_default();

        let dropped = self.pending_images.rekey(&key, |index| {
            let variant_id = old_ids.get(index).copied().flatten()?;
            new_ids.iter().position(|id| *id == Some(variant_id))
        });
        if dropped > 0 {
            tracing::warn!(product = %key, dropped, "Discarded pending images of variants no longer in the store");
        }
    }
}

/// Marks a variant busy until dropped
struct InFlight {
    state: Arc<RwLock<WorkstationState>>,
    variant_id: String,
}

impl InFlight {
    fn begin(state: &Arc<RwLock<WorkstationState>>, variant_id: &str) -> Result<Self> {
        if !state.write().in_flight.insert(variant_id.to_string()) {
            return Err(CatalogError::Busy(variant_id.to_string()));
        }
        Ok(Self {
            state: Arc::clone(state),
            variant_id: variant_id.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state.write().in_flight.remove(&self.variant_id);
    }
}

/// Keeps `is_loading` true until dropped
struct Loading {
    state: Arc<RwLock<WorkstationState>>,
}

impl Loading {
    fn begin(state: &Arc<RwLock<WorkstationState>>) -> Self {
        state.write().loading += 1;
        Self {
            state: Arc::clone(state),
        }
    }
}

impl Drop for Loading {
    fn drop(&mut self) {
        let mut state = self.state.write();
        state.loading = state.loading.saturating_sub(1);
    }
}

pub struct VariantWorkstation {
    client: CatalogClient,
    state: Arc<RwLock<WorkstationState>>,
    liveness: Liveness,
}

impl VariantWorkstation {
    pub fn new(client: CatalogClient) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(WorkstationState::default())),
            liveness: Liveness::new(),
        }
    }

    /// Stop applying results. Calls still in flight finish without touching state.
    pub fn dispose(&self) {
        self.liveness.end();
        tracing::info!("Variant workstation disposed");
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.liveness.is_alive() {
            Ok(())
        } else {
            Err(CatalogError::Disposed)
        }
    }

    // ---- Reads ----

    pub fn products(&self) -> Vec<Product> {
        self.state.read().products.clone()
    }

    pub fn product(&self, key: &ProductKey) -> Result<Product> {
        self.state.read().product(key).cloned()
    }

    pub fn draft(&self) -> Option<Product> {
        self.state.read().draft.clone()
    }

    pub fn pending_images(&self, key: &ProductKey, index: usize) -> Vec<PendingImage> {
        self.state.read().pending_images.get(key, index).to_vec()
    }

    pub fn pending_deletion(&self) -> Option<PendingDeletion> {
        self.state.read().deletion.pending().cloned()
    }

    pub fn is_busy(&self, variant_id: &str) -> bool {
        self.state.read().in_flight.contains(variant_id)
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading > 0
    }

    // ---- Loading ----

    /// Replace the local product list with the store's.
    pub async fn load_products(&self) -> Result<Vec<Product>> {
        self.ensure_alive()?;
        let _loading = Loading::begin(&self.state);

        let products = self.client.list_products().await?;
        self.ensure_alive()?;

        tracing::info!(count = products.len(), "Loaded products");
        self.state.write().replace_products(products.clone());
        Ok(products)
    }

    /// Fetch one product and insert or replace it locally.
    pub async fn load_product(&self, product_id: &str) -> Result<Product> {
        self.ensure_alive()?;
        let _loading = Loading::begin(&self.state);

        let mut product = self.client.get_product(product_id).await?;
        self.ensure_alive()?;

        if product.id.is_none() {
            product.id = Some(product_id.to_string());
        }
        tracing::debug!(product_id = %product_id, variants = product.variants.len(), "Loaded product");
        self.state.write().upsert(product.clone());
        Ok(product)
    }

    // ---- Draft ----

    /// Start composing a new product, replacing any previous draft.
    pub fn begin_draft(&self, name: impl Into<String>) -> Product {
        let draft = Product::new(name);
        let mut state = self.state.write();
        state.pending_images.clear_product(&ProductKey::Draft);
        state.draft = Some(draft.clone());
        draft
    }

    pub fn rename_draft(&self, name: impl Into<String>) -> Result<()> {
        let mut state = self.state.write();
        state.product_mut(&ProductKey::Draft)?.name = name.into();
        Ok(())
    }

    pub fn discard_draft(&self) -> Option<Product> {
        let mut state = self.state.write();
        state.pending_images.clear_product(&ProductKey::Draft);
        state.draft.take()
    }

    /// Create the draft in the store.
    ///
    /// On success the saved record joins the product list, pending images
    /// follow it to its new id and the draft is cleared. On failure the draft
    /// stays as it was.
    pub async fn save_draft(&self) -> Result<Product> {
        self.ensure_alive()?;
        let mut draft = self.product(&ProductKey::Draft)?;
        if draft.name.trim().is_empty() {
            return Err(CatalogError::InvalidField {
                field: "name".to_string(),
                value: draft.name,
            });
        }
        draft.recompute_total_stock();

        let _loading = Loading::begin(&self.state);
        let saved = match self.client.create_product(&draft).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(error = %e, "Saving draft product failed");
                return Err(e);
            }
        };
        self.ensure_alive()?;

        let mut state = self.state.write();
        if let Some(id) = saved.id.clone() {
            state
                .pending_images
                .migrate(&ProductKey::Draft, ProductKey::Persisted(id));
        } else {
            state.pending_images.clear_product(&ProductKey::Draft);
        }
        state.draft = None;
        state.upsert(saved.clone());

        tracing::info!(product_id = ?saved.id, variants = saved.variants.len(), "Saved draft product");
        Ok(saved)
    }

    // ---- Local edits ----

    /// Append a blank variant and return its index.
    pub fn add_variant(&self, key: &ProductKey) -> Result<usize> {
        let mut state = self.state.write();
        let product = state.product_mut(key)?;
        let index = product.add_variant();
        product.recompute_total_stock();
        tracing::debug!(product = %key, index, "Added variant");
        Ok(index)
    }

    /// Write one field of a variant from form input. Local only.
    pub fn update_variant_field(
        &self,
        key: &ProductKey,
        index: usize,
        field: &VariantField,
        input: &str,
    ) -> Result<Variant> {
        let mut state = self.state.write();
        let product = state.product_mut(key)?;
        let variant = product.variant_mut(index)?;
        variant.set_field(field, input)?;
        let updated = variant.clone();

        if *field == VariantField::IsDefault && updated.is_default {
            for (i, other) in product.variants.iter_mut().enumerate() {
                if i != index {
                    other.is_default = false;
                }
            }
        }
        if field.touches_stock() {
            product.recompute_total_stock();
        }
        Ok(updated)
    }

    /// Keep a local file for the variant at `index` until it is uploaded.
    pub fn attach_variant_image(
        &self,
        key: &ProductKey,
        index: usize,
        image: PendingImage,
    ) -> Result<Uuid> {
        let mut state = self.state.write();
        state.product(key)?.variant(index)?;

        let handle = image.handle;
        tracing::debug!(product = %key, index, file = %image.file_name, bytes = image.size(), "Attached image");
        state.pending_images.attach(key.clone(), index, image);
        Ok(handle)
    }

    pub fn discard_pending_image(&self, key: &ProductKey, index: usize, handle: Uuid) -> bool {
        self.state
            .write()
            .pending_images
            .discard(key, index, handle)
    }

    /// Splice an unsaved variant out of the draft. No remote call.
    pub fn remove_variant_locally(&self, index: usize) -> Result<Variant> {
        let mut state = self.state.write();
        let draft = state.product_mut(&ProductKey::Draft)?;
        if let Some(id) = draft.variant(index)?.id.clone() {
            return Err(CatalogError::PersistedVariant(id));
        }
        let removed = draft.remove_variant_at(index)?;
        state.pending_images.remove_index(&ProductKey::Draft, index);
        Ok(removed)
    }

    // ---- Remote mutations ----

    /// Send a partial update for a saved variant and merge it on success.
    ///
    /// Images, attributes and the default flag are left as they are. On
    /// failure the local record is unchanged and the error carries the
    /// server's message.
    pub async fn submit_variant_edit(&self, variant_id: &str, edit: VariantEdit) -> Result<Variant> {
        if variant_id.trim().is_empty() {
            return Err(CatalogError::UnsavedVariant);
        }
        self.ensure_alive()?;
        edit.validate()?;
        if self.state.read().locate(variant_id).is_none() {
            return Err(CatalogError::VariantNotFound(variant_id.to_string()));
        }

        let _in_flight = InFlight::begin(&self.state, variant_id)?;
        if let Err(e) = self.client.update_variant(variant_id, &edit).await {
            tracing::warn!(variant_id = %variant_id, error = %e, "Variant update failed");
            return Err(e);
        }
        self.ensure_alive()?;

        let mut state = self.state.write();
        let (key, index) = state
            .locate(variant_id)
            .ok_or_else(|| CatalogError::VariantNotFound(variant_id.to_string()))?;
        let product = state.product_mut(&key)?;
        let variant = product.variant_mut(index)?;
        edit.apply_to(variant);
        let updated = variant.clone();
        if edit.touches_stock() {
            product.recompute_total_stock();
        }

        tracing::info!(variant_id = %variant_id, sku = %updated.sku, "Variant updated");
        Ok(updated)
    }

    /// Ask to delete a saved variant. Nothing is sent until
    /// [`confirm_deletion`](Self::confirm_deletion).
    pub fn delete_variant(&self, product_id: &str, variant_id: &str) -> Result<DeleteOutcome> {
        if variant_id.trim().is_empty() {
            return Err(CatalogError::UnsavedVariant);
        }
        let mut state = self.state.write();
        let product = state.product(&ProductKey::persisted(product_id))?;
        if product.position_of(variant_id).is_none() {
            return Err(CatalogError::VariantNotFound(variant_id.to_string()));
        }

        let target = state.deletion.request(PendingDeletion {
            product_id: product_id.to_string(),
            variant_id: variant_id.to_string(),
        });
        tracing::debug!(variant_id = %variant_id, "Deletion awaiting confirmation");
        Ok(DeleteOutcome::AwaitingConfirmation(target))
    }

    pub fn cancel_deletion(&self) -> Option<PendingDeletion> {
        self.state.write().deletion.cancel()
    }

    /// Fire the confirmed deletion.
    ///
    /// The pending target is cleared whatever the outcome. On success the
    /// variant is removed, `total_stock` recomputed and a new default
    /// promoted if needed.
    pub async fn confirm_deletion(&self) -> Result<DeleteOutcome> {
        let target = self
            .state
            .write()
            .deletion
            .take()
            .ok_or(CatalogError::NoPendingDeletion)?;
        self.ensure_alive()?;

        let _in_flight = InFlight::begin(&self.state, &target.variant_id)?;
        if let Err(e) = self.client.delete_variant(&target.variant_id).await {
            tracing::warn!(variant_id = %target.variant_id, error = %e, "Variant delete failed");
            return Err(e);
        }
        self.ensure_alive()?;

        let mut state = self.state.write();
        let key = ProductKey::persisted(target.product_id.clone());
        let Ok(product) = state.product_mut(&key) else {
            tracing::warn!(
                product_id = %target.product_id,
                variant_id = %target.variant_id,
                "Variant deleted but its product is no longer loaded"
            );
            return Ok(DeleteOutcome::Deleted(target));
        };
        if let Some(index) = product.position_of(&target.variant_id) {
            product.remove_variant_at(index)?;
            let total_stock = product.total_stock;
            state.pending_images.remove_index(&key, index);
            tracing::info!(
                variant_id = %target.variant_id,
                total_stock,
                "Variant deleted"
            );
        }

        Ok(DeleteOutcome::Deleted(target))
    }

    /// Upload the variant's pending images and append the returned URLs.
    ///
    /// Pending images are cleared only after the store accepted them.
    pub async fn upload_variant_images(&self, variant_id: &str) -> Result<Vec<String>> {
        if variant_id.trim().is_empty() {
            return Err(CatalogError::UnsavedVariant);
        }
        self.ensure_alive()?;

        let pending = {
            let state = self.state.read();
            let (key, index) = state
                .locate(variant_id)
                .ok_or_else(|| CatalogError::VariantNotFound(variant_id.to_string()))?;
            state.pending_images.get(&key, index).to_vec()
        };
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let _in_flight = InFlight::begin(&self.state, variant_id)?;
        let files = pending.iter().map(PendingImage::to_file_part).collect();
        let urls = match self.client.upload_variant_images(variant_id, files).await {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!(variant_id = %variant_id, error = %e, "Image upload failed");
                return Err(e);
            }
        };
        self.ensure_alive()?;

        let mut state = self.state.write();
        let (key, index) = state
            .locate(variant_id)
            .ok_or_else(|| CatalogError::VariantNotFound(variant_id.to_string()))?;
        state
            .product_mut(&key)?
            .variant_mut(index)?
            .images
            .extend(urls.iter().cloned());
        for image in &pending {
            state.pending_images.discard(&key, index, image.handle);
        }

        tracing::info!(variant_id = %variant_id, uploaded = urls.len(), "Uploaded variant images");
        Ok(urls)
    }
}

impl Clone for VariantWorkstation {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            state: Arc::clone(&self.state),
            liveness: self.liveness.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::CatalogEndpoints;
    use emporium_api::testing::ScriptedTransport;
    use emporium_api::{ApiResponse, Method, RequestBody};
    use serde_json::json;
    use std::time::Duration;

    fn setup_with(transport: ScriptedTransport) -> (VariantWorkstation, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let base = "https://shop.example.com".parse().unwrap();
        let client = CatalogClient::new(
            transport.clone(),
            CatalogEndpoints::from_base(&base).unwrap(),
        );
        (VariantWorkstation::new(client), transport)
    }

    fn setup() -> (VariantWorkstation, Arc<ScriptedTransport>) {
        setup_with(ScriptedTransport::new())
    }

    fn variant_json(id: &str, stock: u64, is_default: bool) -> serde_json::Value {
        json!({
            "_id": id,
            "sku": format!("SKU-{id}"),
            "price": 10.0,
            "stock": stock,
            "attributes": { "color": "red" },
            "images": ["a.jpg"],
            "isDefault": is_default
        })
    }

    /// Product p1 with variants v1..v3 of stock 5, 3, 2; v1 is default.
    async fn loaded(transport: &ScriptedTransport, workstation: &VariantWorkstation) {
        transport.respond_json(
            Method::Get,
            "/api/products",
            200,
            json!({
                "success": true,
                "data": [{
                    "_id": "p1",
                    "name": "Tee",
                    "totalStock": 10,
                    "variants": [
                        variant_json("v1", 5, true),
                        variant_json("v2", 3, false),
                        variant_json("v3", 2, false)
                    ]
                }]
            }),
        );
        workstation.load_products().await.unwrap();
    }

    fn p1() -> ProductKey {
        ProductKey::persisted("p1")
    }

    fn stocks(workstation: &VariantWorkstation) -> Vec<u64> {
        workstation
            .product(&p1())
            .unwrap()
            .variants
            .iter()
            .map(|v| v.stock)
            .collect()
    }

    #[tokio::test]
    async fn test_load_products() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;

        let products = workstation.products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].variants.len(), 3);
        assert!(!workstation.is_loading());
    }

    #[tokio::test]
    async fn test_add_variant_defaults() {
        let (workstation, _) = setup();
        workstation.begin_draft("Mug");

        assert_eq!(workstation.add_variant(&ProductKey::Draft).unwrap(), 0);
        assert_eq!(workstation.add_variant(&ProductKey::Draft).unwrap(), 1);

        let draft = workstation.draft().unwrap();
        assert!(draft.variants[0].is_default);
        assert!(!draft.variants[1].is_default);
    }

    #[tokio::test]
    async fn test_update_field_is_local_and_recomputes_stock() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;

        workstation
            .update_variant_field(&p1(), 2, &VariantField::Stock, "12")
            .unwrap();

        assert_eq!(workstation.product(&p1()).unwrap().total_stock, 20);
        assert_eq!(transport.requests().len(), 1);

        let err = workstation
            .update_variant_field(&p1(), 0, &VariantField::Price, "-3")
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidField { .. }));
        assert_eq!(workstation.product(&p1()).unwrap().variants[0].price, 10.0);
    }

    #[tokio::test]
    async fn test_setting_default_clears_others() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;

        workstation
            .update_variant_field(&p1(), 1, &VariantField::IsDefault, "true")
            .unwrap();

        let product = workstation.product(&p1()).unwrap();
        let defaults: Vec<bool> = product.variants.iter().map(|v| v.is_default).collect();
        assert_eq!(defaults, vec![false, true, false]);
    }

    #[tokio::test]
    async fn test_submit_preserves_untouched_fields() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Patch, "/api/variants/v1", 200, json!({ "success": true }));

        let edit = VariantEdit {
            sku: Some("NEW".to_string()),
            ..Default::default()
        };
        let updated = workstation.submit_variant_edit("v1", edit).await.unwrap();

        assert_eq!(updated.sku, "NEW");
        assert_eq!(updated.images, vec!["a.jpg".to_string()]);
        assert_eq!(updated.attributes["color"].display(), "red");
        assert!(updated.is_default);
        assert_eq!(workstation.product(&p1()).unwrap().variants[0], updated);
    }

    #[tokio::test]
    async fn test_submit_stock_change_recomputes_total() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Patch, "/api/variants/v2", 200, json!({ "success": true }));

        let edit = VariantEdit {
            stock: Some(13),
            ..Default::default()
        };
        workstation.submit_variant_edit("v2", edit).await.unwrap();

        assert_eq!(workstation.product(&p1()).unwrap().total_stock, 20);
    }

    #[tokio::test]
    async fn test_sequential_submits_second_fails() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Patch, "/api/variants/v1", 200, json!({ "success": true }));
        transport.respond_json(
            Method::Patch,
            "/api/variants/v2",
            500,
            json!({ "success": false, "message": "Database unavailable" }),
        );

        let first = workstation
            .submit_variant_edit(
                "v1",
                VariantEdit {
                    sku: Some("V1-NEW".to_string()),
                    price: Some(12.0),
                    stock: Some(6),
                },
            )
            .await;
        let second = workstation
            .submit_variant_edit(
                "v2",
                VariantEdit {
                    sku: Some("V2-NEW".to_string()),
                    price: Some(99.0),
                    stock: Some(30),
                },
            )
            .await;

        assert!(first.is_ok());
        let err = second.unwrap_err();
        assert_eq!(err.to_string(), "Database unavailable");

        let product = workstation.product(&p1()).unwrap();
        assert_eq!(product.variants[0].sku, "V1-NEW");
        assert_eq!(product.variants[0].stock, 6);
        assert_eq!(product.variants[1].sku, "SKU-v2");
        assert_eq!(product.variants[1].price, 10.0);
        assert_eq!(product.variants[1].stock, 3);
        assert_eq!(product.total_stock, 11);
    }

    #[tokio::test]
    async fn test_submit_guards() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;

        assert!(matches!(
            workstation.submit_variant_edit("", VariantEdit::default()).await,
            Err(CatalogError::UnsavedVariant)
        ));
        let edit = VariantEdit {
            sku: Some("X".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            workstation.submit_variant_edit("v404", edit).await,
            Err(CatalogError::VariantNotFound(_))
        ));
        assert_eq!(transport.count(Method::Patch, "/api/variants/v404"), 0);
    }

    #[tokio::test]
    async fn test_empty_edit_is_rejected_locally() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;

        let result = workstation.submit_variant_edit("v1", VariantEdit::default()).await;

        assert!(matches!(result, Err(CatalogError::InvalidField { ref field, .. }) if field == "edit"));
        assert_eq!(transport.count(Method::Patch, "/api/variants/v1"), 0);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_busy() {
        let (workstation, transport) =
            setup_with(ScriptedTransport::new().with_delay(Duration::from_millis(20)));
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Patch, "/api/variants/v1", 200, json!({ "success": true }));

        let edit = VariantEdit {
            stock: Some(1),
            ..Default::default()
        };
        let busy_check = async {
            tokio::task::yield_now().await;
            let busy = workstation.is_busy("v1");
            let second = workstation.submit_variant_edit("v1", edit.clone()).await;
            (busy, second)
        };
        let (first, (busy, second)) =
            tokio::join!(workstation.submit_variant_edit("v1", edit.clone()), busy_check);

        assert!(first.is_ok());
        assert!(busy);
        assert!(matches!(second, Err(CatalogError::Busy(_))));
        assert!(!workstation.is_busy("v1"));
        assert_eq!(transport.count(Method::Patch, "/api/variants/v1"), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Delete, "/api/variants/v2", 200, json!({ "success": true }));

        let outcome = workstation.delete_variant("p1", "v2").unwrap();
        assert!(matches!(outcome, DeleteOutcome::AwaitingConfirmation(_)));
        assert_eq!(transport.count(Method::Delete, "/api/variants/v2"), 0);

        let outcome = workstation.confirm_deletion().await.unwrap();
        assert!(matches!(outcome, DeleteOutcome::Deleted(_)));
        assert_eq!(transport.count(Method::Delete, "/api/variants/v2"), 1);

        let product = workstation.product(&p1()).unwrap();
        assert_eq!(product.variants.len(), 2);
        assert!(product.position_of("v2").is_none());
        assert_eq!(product.total_stock, 7);
        assert!(workstation.pending_deletion().is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_state_and_clears_target() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(
            Method::Delete,
            "/api/variants/v2",
            409,
            json!({ "success": false, "message": "Variant has open orders" }),
        );

        workstation.delete_variant("p1", "v2").unwrap();
        let err = workstation.confirm_deletion().await.unwrap_err();

        assert_eq!(err.to_string(), "Variant has open orders");
        assert_eq!(stocks(&workstation), vec![5, 3, 2]);
        assert!(workstation.pending_deletion().is_none());
        assert!(matches!(
            workstation.confirm_deletion().await,
            Err(CatalogError::NoPendingDeletion)
        ));
    }

    #[tokio::test]
    async fn test_cancel_deletion_sends_nothing() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;

        workstation.delete_variant("p1", "v3").unwrap();
        assert_eq!(workstation.cancel_deletion().unwrap().variant_id, "v3");
        assert!(workstation.confirm_deletion().await.is_err());
        assert_eq!(transport.count(Method::Delete, "/api/variants/v3"), 0);
    }

    #[tokio::test]
    async fn test_deleting_default_promotes_next() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond(Method::Delete, "/api/variants/v1", ApiResponse::new(204, Vec::new()));

        workstation.delete_variant("p1", "v1").unwrap();
        workstation.confirm_deletion().await.unwrap();

        let product = workstation.product(&p1()).unwrap();
        assert!(product.variants[0].is_default);
        assert_eq!(product.variants[0].id.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_delete_shifts_pending_images() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Delete, "/api/variants/v1", 200, json!({ "success": true }));
        workstation
            .attach_variant_image(&p1(), 2, PendingImage::new("c.png", "image/png", vec![1]))
            .unwrap();

        workstation.delete_variant("p1", "v1").unwrap();
        workstation.confirm_deletion().await.unwrap();

        assert_eq!(workstation.pending_images(&p1(), 1)[0].file_name, "c.png");
        assert!(workstation.pending_images(&p1(), 2).is_empty());
    }

    #[tokio::test]
    async fn test_remove_variant_locally() {
        let (workstation, transport) = setup();
        workstation.begin_draft("Mug");
        workstation.add_variant(&ProductKey::Draft).unwrap();
        workstation.add_variant(&ProductKey::Draft).unwrap();

        let removed = workstation.remove_variant_locally(1).unwrap();
        assert!(!removed.is_default);
        assert_eq!(workstation.draft().unwrap().variants.len(), 1);
        assert!(transport.requests().is_empty());

        assert!(matches!(
            workstation.remove_variant_locally(4),
            Err(CatalogError::IndexOutOfRange(4))
        ));
    }

    #[tokio::test]
    async fn test_remove_variant_locally_rejects_saved_variant() {
        let (workstation, _) = setup();
        workstation.begin_draft("Mug");
        workstation.add_variant(&ProductKey::Draft).unwrap();
        {
            let mut state = workstation.state.write();
            state.draft.as_mut().unwrap().variants[0].id = Some("v7".to_string());
        }

        assert!(matches!(
            workstation.remove_variant_locally(0),
            Err(CatalogError::PersistedVariant(id)) if id == "v7"
        ));
    }

    #[tokio::test]
    async fn test_attach_keeps_persisted_images() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;

        let handle = workstation
            .attach_variant_image(&p1(), 0, PendingImage::new("b.png", "image/png", vec![1]))
            .unwrap();

        assert_eq!(workstation.pending_images(&p1(), 0).len(), 1);
        assert_eq!(
            workstation.product(&p1()).unwrap().variants[0].images,
            vec!["a.jpg".to_string()]
        );
        assert!(workstation.discard_pending_image(&p1(), 0, handle));
        assert!(workstation.pending_images(&p1(), 0).is_empty());

        assert!(matches!(
            workstation.attach_variant_image(&p1(), 9, PendingImage::new("x.png", "image/png", vec![])),
            Err(CatalogError::IndexOutOfRange(9))
        ));
    }

    #[tokio::test]
    async fn test_upload_appends_urls_and_clears_pending() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(
            Method::Post,
            "/api/variants/v2/images",
            200,
            json!({ "success": true, "data": { "images": ["https://cdn.example.com/b.png"] } }),
        );
        workstation
            .attach_variant_image(&p1(), 1, PendingImage::new("b.png", "image/png", vec![1]))
            .unwrap();

        let urls = workstation.upload_variant_images("v2").await.unwrap();

        assert_eq!(urls.len(), 1);
        let variant = &workstation.product(&p1()).unwrap().variants[1];
        assert_eq!(
            variant.images,
            vec!["a.jpg".to_string(), "https://cdn.example.com/b.png".to_string()]
        );
        assert!(workstation.pending_images(&p1(), 1).is_empty());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_pending() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Post, "/api/variants/v2/images", 413, json!({ "message": "Too large" }));
        workstation
            .attach_variant_image(&p1(), 1, PendingImage::new("b.png", "image/png", vec![1]))
            .unwrap();

        assert!(workstation.upload_variant_images("v2").await.is_err());
        assert_eq!(workstation.pending_images(&p1(), 1).len(), 1);
        assert_eq!(workstation.product(&p1()).unwrap().variants[1].images.len(), 1);
    }

    #[tokio::test]
    async fn test_save_draft_moves_pending_images() {
        let (workstation, transport) = setup();
        transport.respond_json(
            Method::Post,
            "/api/products",
            201,
            json!({
                "success": true,
                "data": { "product": {
                    "_id": "p9",
                    "name": "Mug",
                    "totalStock": 4,
                    "variants": [variant_json("v90", 4, true)]
                } }
            }),
        );
        workstation.begin_draft("Mug");
        workstation.add_variant(&ProductKey::Draft).unwrap();
        workstation
            .update_variant_field(&ProductKey::Draft, 0, &VariantField::Stock, "4")
            .unwrap();
        workstation
            .attach_variant_image(&ProductKey::Draft, 0, PendingImage::new("m.png", "image/png", vec![1]))
            .unwrap();

        let saved = workstation.save_draft().await.unwrap();

        assert_eq!(saved.id.as_deref(), Some("p9"));
        assert!(workstation.draft().is_none());
        assert_eq!(workstation.products().len(), 1);
        assert_eq!(workstation.pending_images(&ProductKey::persisted("p9"), 0).len(), 1);

        let sent = &transport.requests()[0];
        let RequestBody::Json(body) = &sent.body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["totalStock"], 4);
        assert!(body["variants"][0].get("id").is_none());
    }

    #[tokio::test]
    async fn test_save_draft_failure_keeps_draft() {
        let (workstation, transport) = setup();
        transport.respond_json(Method::Post, "/api/products", 400, json!({ "message": "Name taken" }));
        workstation.begin_draft("Mug");

        let err = workstation.save_draft().await.unwrap_err();

        assert_eq!(err.to_string(), "Name taken");
        assert_eq!(workstation.draft().unwrap().name, "Mug");

        workstation.discard_draft();
        assert!(matches!(
            workstation.save_draft().await,
            Err(CatalogError::NoDraft)
        ));
        assert_eq!(transport.count(Method::Post, "/api/products"), 1);
    }

    #[tokio::test]
    async fn test_disposed_workstation_ignores_late_results() {
        let (workstation, transport) =
            setup_with(ScriptedTransport::new().with_delay(Duration::from_millis(20)));
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Patch, "/api/variants/v1", 200, json!({ "success": true }));

        let dispose = async {
            tokio::task::yield_now().await;
            workstation.dispose();
        };
        let edit = VariantEdit {
            sku: Some("LATE".to_string()),
            ..Default::default()
        };
        let (result, _) = tokio::join!(workstation.submit_variant_edit("v1", edit), dispose);

        assert!(matches!(result, Err(CatalogError::Disposed)));
        assert_eq!(workstation.product(&p1()).unwrap().variants[0].sku, "SKU-v1");
    }

    #[tokio::test]
    async fn test_expired_session_surfaces_as_unauthenticated() {
        use async_trait::async_trait;
        use emporium_api::{ApiRequest, RequestExecutor, TransportError};

        struct Expired;

        #[async_trait]
        impl RequestExecutor for Expired {
            async fn execute(
                &self,
                _request: ApiRequest,
            ) -> std::result::Result<Option<ApiResponse>, TransportError> {
                Ok(None)
            }
        }

        let base = "https://shop.example.com".parse().unwrap();
        let client = CatalogClient::new(Arc::new(Expired), CatalogEndpoints::from_base(&base).unwrap());
        let workstation = VariantWorkstation::new(client);

        assert!(matches!(
            workstation.load_products().await,
            Err(CatalogError::Unauthenticated)
        ));
        assert!(!workstation.is_loading());
    }

    fn product_json(id: &str, variants: Vec<serde_json::Value>) -> serde_json::Value {
        json!({ "_id": id, "name": "Tee", "variants": variants })
    }

    #[tokio::test]
    async fn test_reload_keeps_pending_images_with_their_variant() {
        let (workstation, transport) = setup();
        transport
            .respond_json(
                Method::Get,
                "/api/products",
                200,
                json!({ "success": true, "data": [product_json("p1", vec![
                    variant_json("v1", 5, true),
                    variant_json("v2", 3, false),
                    variant_json("v3", 2, false),
                ])] }),
            )
            .respond_json(
                Method::Get,
                "/api/products",
                200,
                json!({ "success": true, "data": [product_json("p1", vec![
                    variant_json("v3", 2, false),
                    variant_json("v1", 5, true),
                ])] }),
            );
        workstation.load_products().await.unwrap();
        workstation
            .attach_variant_image(&p1(), 2, PendingImage::new("v3.png", "image/png", vec![1]))
            .unwrap();
        workstation
            .attach_variant_image(&p1(), 1, PendingImage::new("v2.png", "image/png", vec![1]))
            .unwrap();

        workstation.load_products().await.unwrap();

        assert_eq!(workstation.pending_images(&p1(), 0)[0].file_name, "v3.png");
        assert!(workstation.pending_images(&p1(), 1).is_empty());
        assert!(workstation.pending_images(&p1(), 2).is_empty());
    }

    #[tokio::test]
    async fn test_load_product_keeps_pending_images_with_their_variant() {
        let (workstation, transport) = setup();
        loaded(&transport, &workstation).await;
        transport.respond_json(
            Method::Get,
            "/api/products/p1",
            200,
            json!({ "success": true, "data": { "product": product_json("p1", vec![
                variant_json("v2", 3, false),
                variant_json("v1", 5, true),
                variant_json("v3", 2, false),
            ]) } }),
        );
        workstation
            .attach_variant_image(&p1(), 0, PendingImage::new("v1.png", "image/png", vec![1]))
            .unwrap();

        workstation.load_product("p1").await.unwrap();

        assert!(workstation.pending_images(&p1(), 0).is_empty());
        assert_eq!(workstation.pending_images(&p1(), 1)[0].file_name, "v1.png");
    }

    #[tokio::test]
    async fn test_overlapping_edit_and_delete_of_different_variants() {
        let (workstation, transport) =
            setup_with(ScriptedTransport::new().with_delay(Duration::from_millis(20)));
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Patch, "/api/variants/v3", 200, json!({ "success": true }));
        transport.respond_json(Method::Delete, "/api/variants/v2", 200, json!({ "success": true }));

        let edit = VariantEdit {
            sku: Some("V3-NEW".to_string()),
            stock: Some(7),
            ..Default::default()
        };
        let delete = async {
            workstation.delete_variant("p1", "v2").unwrap();
            workstation.confirm_deletion().await
        };
        let (edited, deleted) = tokio::join!(workstation.submit_variant_edit("v3", edit), delete);

        assert!(edited.is_ok());
        assert!(matches!(deleted, Ok(DeleteOutcome::Deleted(_))));

        let product = workstation.product(&p1()).unwrap();
        let ids: Vec<_> = product.variants.iter().map(|v| v.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("v1"), Some("v3")]);
        assert_eq!(product.variants[1].sku, "V3-NEW");
        assert_eq!(product.variants[1].stock, 7);
        assert_eq!(product.total_stock, product.stock_sum());
        assert_eq!(product.total_stock, 12);
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_product_left_the_list() {
        let (workstation, transport) =
            setup_with(ScriptedTransport::new().with_delay(Duration::from_millis(20)));
        loaded(&transport, &workstation).await;
        transport.respond_json(Method::Delete, "/api/variants/v2", 200, json!({ "success": true }));

        workstation.delete_variant("p1", "v2").unwrap();
        let unload = async {
            tokio::task::yield_now().await;
            workstation.state.write().products.clear();
        };
        let (outcome, _) = tokio::join!(workstation.confirm_deletion(), unload);

        assert!(matches!(outcome, Ok(DeleteOutcome::Deleted(ref target)) if target.variant_id == "v2"));
        assert_eq!(transport.count(Method::Delete, "/api/variants/v2"), 1);
    }
}
