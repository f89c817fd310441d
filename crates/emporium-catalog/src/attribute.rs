use serde::{Deserialize, Serialize};

/// Value of a variant attribute such as `color` or `size`.
///
/// Stored as sent; `Other` keeps anything that is neither a string nor a list
/// of strings so it survives a save untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(String),
    Multiple(Vec<String>),
    Other(serde_json::Value),
}

impl AttributeValue {
    /// Text shown for the value: list entries joined with `", "`.
    pub fn display(&self) -> String {
        match self {
            AttributeValue::Single(value) => value.clone(),
            AttributeValue::Multiple(values) => values.join(", "),
            AttributeValue::Other(value) => display_json(value),
        }
    }
}

fn display_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(display_json)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Single(value.to_string())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::Multiple(values)
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}
