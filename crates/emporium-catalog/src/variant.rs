//! Variant record and its editable fields

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::attribute::AttributeValue;
use crate::error::CatalogError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Assigned by the store; `None` until saved
    #[serde(
        default,
        alias = "_id",
        deserialize_with = "emporium_api::ids::opaque_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: u64,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Persisted image URLs
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Variant {
    pub fn blank(is_default: bool) -> Self {
        Self {
            id: None,
            sku: String::new(),
            price: 0.0,
            stock: 0,
            attributes: BTreeMap::new(),
            images: Vec::new(),
            is_default,
            extra: serde_json::Map::new(),
        }
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }

    /// Write one field from form input.
    pub fn set_field(&mut self, field: &VariantField, input: &str) -> Result<()> {
        match field {
            VariantField::Sku => self.sku = input.trim().to_string(),
            VariantField::Price => self.price = parse_price(input)?,
            VariantField::Stock => self.stock = parse_stock(input)?,
            VariantField::IsDefault => {
                self.is_default = match input.trim() {
                    "true" | "1" | "on" => true,
                    "false" | "0" | "off" | "" => false,
                    _ => return Err(invalid(field, input)),
                }
            }
            VariantField::Attribute(name) => {
                let mut values: Vec<String> = input
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect();
                if values.is_empty() {
                    self.attributes.remove(name);
                } else if values.len() == 1 && !input.contains(',') {
                    let value = AttributeValue::Single(values.remove(0));
                    self.attributes.insert(name.clone(), value);
                } else {
                    self.attributes
                        .insert(name.clone(), AttributeValue::Multiple(values));
                }
            }
        }
        Ok(())
    }
}

/// A field editable through the variant form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantField {
    Sku,
    Price,
    Stock,
    IsDefault,
    Attribute(String),
}

impl VariantField {
    pub fn name(&self) -> &str {
        match self {
            VariantField::Sku => "sku",
            VariantField::Price => "price",
            VariantField::Stock => "stock",
            VariantField::IsDefault => "isDefault",
            VariantField::Attribute(name) => name,
        }
    }

    pub fn touches_stock(&self) -> bool {
        matches!(self, VariantField::Stock)
    }
}

impl std::str::FromStr for VariantField {
    type Err = CatalogError;

    /// Known names map to their field; anything else is an attribute name.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        match name {
            "" => Err(CatalogError::InvalidField {
                field: "field".to_string(),
                value: s.to_string(),
            }),
            "sku" => Ok(VariantField::Sku),
            "price" => Ok(VariantField::Price),
            "stock" => Ok(VariantField::Stock),
            "isDefault" | "is_default" => Ok(VariantField::IsDefault),
            other => Ok(VariantField::Attribute(other.to_string())),
        }
    }
}

/// Partial update sent to the store; only present fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariantEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u64>,
}

impl VariantEdit {
    /// Rejects an edit with nothing to send and a negative or non-finite price.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(CatalogError::InvalidField {
                field: "edit".to_string(),
                value: String::new(),
            });
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(CatalogError::InvalidField {
                    field: "price".to_string(),
                    value: price.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sku.is_none() && self.price.is_none() && self.stock.is_none()
    }

    pub fn touches_stock(&self) -> bool {
        self.stock.is_some()
    }

    /// Merge into `variant`; images, attributes and the default flag stay as they are.
    pub fn apply_to(&self, variant: &mut Variant) {
        if let Some(sku) = &self.sku {
            variant.sku = sku.clone();
        }
        if let Some(price) = self.price {
            variant.price = price;
        }
        if let Some(stock) = self.stock {
            variant.stock = stock;
        }
    }
}

fn invalid(field: &VariantField, input: &str) -> CatalogError {
    CatalogError::InvalidField {
        field: field.name().to_string(),
        value: input.to_string(),
    }
}

fn parse_price(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
        _ => Err(invalid(&VariantField::Price, input)),
    }
}

fn parse_stock(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| invalid(&VariantField::Stock, input))
}
