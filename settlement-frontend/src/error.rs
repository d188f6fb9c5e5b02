use service_core::error::AppError;
use service_core::http::RemoteError;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::export::RenderError;

/// Field-keyed validation failures, collected so every problem is reported at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        let mut error = Self::default();
        error.add(field, message);
        error
    }

    /// Keeps the first message recorded for a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .fields
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The owning view was closed while a call was in flight; its result was dropped.
    #[error("Result discarded: the view was closed")]
    Discarded,

    #[error(transparent)]
    Infrastructure(#[from] AppError),
}

impl SettlementError {
    /// Text suitable for a notification.
    pub fn user_message(&self) -> String {
        match self {
            SettlementError::Validation(err) => err.to_string(),
            SettlementError::Remote(err) => err.user_message.clone(),
            SettlementError::Render(_) => "Could not generate the PDF document".to_string(),
            SettlementError::Discarded => "The operation was cancelled".to_string(),
            SettlementError::Infrastructure(err) => err.to_string(),
        }
    }
}
