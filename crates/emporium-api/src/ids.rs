//! Opaque identifiers
//!
//! The remote store hands out ids as strings or as numbers depending on the
//! record. Both are kept as strings on this side.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// `#[serde(deserialize_with = "emporium_api::ids::opaque")]`
pub fn opaque<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let id = RawId::deserialize(deserializer)?.into_string();
    if id.trim().is_empty() {
        return Err(de::Error::custom("identifier cannot be empty"));
    }
    Ok(id)
}

/// Like [`opaque`], for optional ids; `null` and `""` both mean "no id yet".
pub fn opaque_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?
        .map(RawId::into_string)
        .filter(|id| !id.trim().is_empty()))
}
