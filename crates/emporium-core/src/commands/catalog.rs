//! Product and variant commands
//!
//! `product_id: None` addresses the draft product being composed.
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use emporium_catalog::{
    DeleteOutcome, PendingImage, Product, ProductKey, Variant, VariantEdit, VariantField,
    VariantWorkstation,
};

use super::CommandResult;
use crate::console::Console;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct VariantInfo {
    pub id: Option<String>,
    pub sku: String,
    pub price: f64,
    pub stock: u64,
    /// Attribute values as display text
    pub attributes: BTreeMap<String, String>,
    pub images: Vec<String>,
    pub pending_images: Vec<PendingImageInfo>,
    pub is_default: bool,
    pub is_busy: bool,
}

#[derive(Debug, Serialize)]
pub struct PendingImageInfo {
    pub handle: String,
    pub file_name: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct ProductInfo {
    pub id: Option<String>,
    pub name: String,
    pub total_stock: u64,
    pub is_draft: bool,
    pub variants: Vec<VariantInfo>,
}

#[derive(Debug, Serialize)]
pub struct DeletionInfo {
    pub product_id: String,
    pub variant_id: String,
    /// False while the deletion waits for confirmation
    pub deleted: bool,
}

impl From<DeleteOutcome> for DeletionInfo {
    fn from(outcome: DeleteOutcome) -> Self {
        let (target, deleted) = match outcome {
            DeleteOutcome::AwaitingConfirmation(target) => (target, false),
            DeleteOutcome::Deleted(target) => (target, true),
        };
        Self {
            product_id: target.product_id,
            variant_id: target.variant_id,
            deleted,
        }
    }
}

fn key_for(product_id: Option<String>) -> ProductKey {
    match product_id {
        Some(id) => ProductKey::Persisted(id),
        None => ProductKey::Draft,
    }
}

fn variant_info(
    workstation: &VariantWorkstation,
    variant: Variant,
    pending: Vec<PendingImage>,
) -> VariantInfo {
    let is_busy = variant
        .id
        .as_deref()
        .map(|id| workstation.is_busy(id))
        .unwrap_or(false);
    let pending_images = pending
        .into_iter()
        .map(|image| PendingImageInfo {
            handle: image.handle.to_string(),
            size: image.size(),
            file_name: image.file_name,
        })
        .collect();

    VariantInfo {
        attributes: variant
            .attributes
            .iter()
            .map(|(name, value)| (name.clone(), value.display()))
            .collect(),
        id: variant.id,
        sku: variant.sku,
        price: variant.price,
        stock: variant.stock,
        images: variant.images,
        pending_images,
        is_default: variant.is_default,
        is_busy,
    }
}

fn product_info(workstation: &VariantWorkstation, product: Product) -> ProductInfo {
    let key = match &product.id {
        Some(id) => ProductKey::Persisted(id.clone()),
        None => ProductKey::Draft,
    };
    ProductInfo {
        is_draft: key == ProductKey::Draft,
        variants: product
            .variants
            .into_iter()
            .enumerate()
            .map(|(index, variant)| {
                variant_info(workstation, variant, workstation.pending_images(&key, index))
            })
            .collect(),
        id: product.id,
        name: product.name,
        total_stock: product.total_stock,
    }
}

/// Current view of one product after a local edit
fn product_view(console: &Console, key: &ProductKey) -> CommandResult<ProductInfo> {
    let workstation = console.workstation();
    match workstation.product(key) {
        Ok(product) => CommandResult::ok(product_info(workstation, product)),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub fn list_products(state: &AppState) -> CommandResult<Vec<ProductInfo>> {
    match state.console() {
        Ok(console) => {
            let workstation = console.workstation();
            let products = workstation
                .products()
                .into_iter()
                .map(|p| product_info(workstation, p))
                .collect();
            CommandResult::ok(products)
        }
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub fn get_product(state: &AppState, product_id: Option<String>) -> CommandResult<ProductInfo> {
    match state.console() {
        Ok(console) => product_view(&console, &key_for(product_id)),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub fn is_loading(state: &AppState) -> CommandResult<bool> {
    match state.console() {
        Ok(console) => CommandResult::ok(console.workstation().is_loading()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn load_products(state: &AppState) -> CommandResult<Vec<ProductInfo>> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let workstation = console.workstation();
    match workstation.load_products().await {
        Ok(products) => CommandResult::ok(
            products
                .into_iter()
                .map(|p| product_info(workstation, p))
                .collect(),
        ),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn load_product(state: &AppState, product_id: String) -> CommandResult<ProductInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    match console.workstation().load_product(&product_id).await {
        Ok(product) => CommandResult::ok(product_info(console.workstation(), product)),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub fn begin_draft(state: &AppState, name: String) -> CommandResult<ProductInfo> {
    match state.console() {
        Ok(console) => {
            let draft = console.workstation().begin_draft(name);
            CommandResult::ok(product_info(console.workstation(), draft))
        }
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub fn rename_draft(state: &AppState, name: String) -> CommandResult<ProductInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    if let Err(e) = console.workstation().rename_draft(name) {
        return CommandResult::err(e.to_string());
    }
    product_view(&console, &ProductKey::Draft)
}

pub fn discard_draft(state: &AppState) -> CommandResult<bool> {
    match state.console() {
        Ok(console) => CommandResult::ok(console.workstation().discard_draft().is_some()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn save_draft(state: &AppState) -> CommandResult<ProductInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    match console.workstation().save_draft().await {
        Ok(product) => CommandResult::ok(product_info(console.workstation(), product)),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub fn add_variant(state: &AppState, product_id: Option<String>) -> CommandResult<ProductInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let key = key_for(product_id);
    if let Err(e) = console.workstation().add_variant(&key) {
        return CommandResult::err(e.to_string());
    }
    product_view(&console, &key)
}

pub fn update_variant_field(
    state: &AppState,
    product_id: Option<String>,
    index: usize,
    field: String,
    value: String,
) -> CommandResult<ProductInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let field: VariantField = match field.parse() {
        Ok(field) => field,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    let key = key_for(product_id);
    if let Err(e) = console
        .workstation()
        .update_variant_field(&key, index, &field, &value)
    {
        return CommandResult::err(e.to_string());
    }
    product_view(&console, &key)
}

pub fn remove_draft_variant(state: &AppState, index: usize) -> CommandResult<ProductInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    if let Err(e) = console.workstation().remove_variant_locally(index) {
        return CommandResult::err(e.to_string());
    }
    product_view(&console, &ProductKey::Draft)
}

pub fn attach_variant_image(
    state: &AppState,
    product_id: Option<String>,
    index: usize,
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
) -> CommandResult<String> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let image = PendingImage::new(file_name, content_type, bytes);
    console
        .workstation()
        .attach_variant_image(&key_for(product_id), index, image)
        .map(|handle| handle.to_string())
        .into()
}

pub fn discard_pending_image(
    state: &AppState,
    product_id: Option<String>,
    index: usize,
    handle: String,
) -> CommandResult<bool> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let handle = match Uuid::parse_str(&handle) {
        Ok(handle) => handle,
        Err(e) => return CommandResult::err(format!("Invalid image handle: {e}")),
    };
    CommandResult::ok(
        console
            .workstation()
            .discard_pending_image(&key_for(product_id), index, handle),
    )
}

pub async fn submit_variant_edit(
    state: &AppState,
    variant_id: String,
    sku: Option<String>,
    price: Option<f64>,
    stock: Option<u64>,
) -> CommandResult<VariantInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let edit = VariantEdit { sku, price, stock };
    let workstation = console.workstation();
    let variant = match workstation.submit_variant_edit(&variant_id, edit).await {
        Ok(variant) => variant,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    let location = workstation.products().into_iter().find_map(|product| {
        let index = product.position_of(&variant_id)?;
        Some((ProductKey::Persisted(product.id?), index))
    });
    let pending = location
        .map(|(key, index)| workstation.pending_images(&key, index))
        .unwrap_or_default();
    CommandResult::ok(variant_info(workstation, variant, pending))
}

pub async fn upload_variant_images(state: &AppState, variant_id: String) -> CommandResult<Vec<String>> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    console
        .workstation()
        .upload_variant_images(&variant_id)
        .await
        .into()
}

pub fn request_variant_deletion(
    state: &AppState,
    product_id: String,
    variant_id: String,
) -> CommandResult<DeletionInfo> {
    match state.console() {
        Ok(console) => console
            .workstation()
            .delete_variant(&product_id, &variant_id)
            .map(DeletionInfo::from)
            .into(),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

pub async fn confirm_variant_deletion(state: &AppState) -> CommandResult<DeletionInfo> {
    let console = match state.console() {
        Ok(console) => console,
        Err(e) => return CommandResult::err(e.to_string()),
    };

    console
        .workstation()
        .confirm_deletion()
        .await
        .map(DeletionInfo::from)
        .into()
}

pub fn cancel_variant_deletion(state: &AppState) -> CommandResult<bool> {
    match state.console() {
        Ok(console) => CommandResult::ok(console.workstation().cancel_deletion().is_some()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}
