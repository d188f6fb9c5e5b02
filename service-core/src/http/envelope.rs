//! Decoding of list responses.
//!
//! The backend answers list endpoints with one of a few shapes. Each shape is
//! a variant here and [`ListEnvelope::decode`] is the only place that knows
//! them; anything else is rejected instead of being read as an empty list.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Keys under which a list may be wrapped, tried in order before the
/// resource's own name.
pub const CONVENTIONAL_KEYS: [&str; 3] = ["results", "data", "items"];

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("unexpected list response shape: {0}")]
    UnexpectedShape(String),

    #[error("list item could not be decoded: {0}")]
    Item(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListEnvelope {
    /// `[ {...}, {...} ]`
    Bare(Vec<Value>),
    /// `{ "results": [...] }`, `{ "data": [...] }`, `{ "items": [...] }` or
    /// `{ "<resource>": [...] }`.
    Keyed { key: String, items: Vec<Value> },
    /// A single entity object, treated as a one-element list.
    Single(Value),
}

impl ListEnvelope {
    pub fn decode(value: Value, resource_key: &str) -> Result<Self, EnvelopeError> {
        match value {
            Value::Array(items) => Ok(ListEnvelope::Bare(items)),
            Value::Object(mut map) => {
                let keys = CONVENTIONAL_KEYS.iter().copied().chain([resource_key]);
                for key in keys {
                    if matches!(map.get(key), Some(Value::Array(_))) {
                        if let Some(Value::Array(items)) = map.remove(key) {
                            return Ok(ListEnvelope::Keyed {
                                key: key.to_string(),
                                items,
                            });
                        }
                    }
                }

                if map.is_empty() {
                    return Err(EnvelopeError::UnexpectedShape("empty object".to_string()));
                }
                if map.contains_key("count") {
                    return Err(EnvelopeError::UnexpectedShape(
                        "paginated object without a result array".to_string(),
                    ));
                }

                Ok(ListEnvelope::Single(Value::Object(map)))
            }
            Value::Null => Err(EnvelopeError::UnexpectedShape("null".to_string())),
            other => Err(EnvelopeError::UnexpectedShape(format!(
                "scalar value {}",
                other
            ))),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ListEnvelope::Bare(items) | ListEnvelope::Keyed { items, .. } => items.len(),
            ListEnvelope::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_items(self) -> Vec<Value> {
        match self {
            ListEnvelope::Bare(items) | ListEnvelope::Keyed { items, .. } => items,
            ListEnvelope::Single(item) => vec![item],
        }
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> Result<Vec<T>, EnvelopeError> {
        self.into_items()
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(EnvelopeError::from))
            .collect()
    }
}
