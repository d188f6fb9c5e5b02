use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Shown wherever a provider's name cannot be resolved.
pub const PROVIDER_PLACEHOLDER: &str = "Provider unavailable";

/// A service provider (manicurista) as the backend describes it.
///
/// Backends disagree on field names, so every known spelling is kept and
/// [`Provider::display_name`] picks the first that is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub nombres: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub apellidos: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub especialidad: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub celular: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub correo: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub documento: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub numero_documento: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub estado: Option<String>,
}

impl Provider {
    /// Embedded shape `{id, nombre}` used once a settlement has been enriched.
    pub fn summary(id: i64, nombre: impl Into<String>) -> Self {
        Self {
            id,
            nombre: Some(nombre.into()),
            ..Self::default()
        }
    }

    /// `nombre`, then `nombres apellidos`, then `name`.
    pub fn display_name(&self) -> Option<String> {
        if let Some(nombre) = non_blank(&self.nombre) {
            return Some(nombre.to_string());
        }

        let full: Vec<&str> = [non_blank(&self.nombres), non_blank(&self.apellidos)]
            .into_iter()
            .flatten()
            .collect();
        if !full.is_empty() {
            return Some(full.join(" "));
        }

        non_blank(&self.name).map(str::to_string)
    }

    pub fn display_name_or_placeholder(&self) -> String {
        self.display_name()
            .unwrap_or_else(|| PROVIDER_PLACEHOLDER.to_string())
    }

    pub fn contact_email(&self) -> Option<&str> {
        non_blank(&self.email).or_else(|| non_blank(&self.correo))
    }

    pub fn document_number(&self) -> Option<&str> {
        non_blank(&self.documento).or_else(|| non_blank(&self.numero_documento))
    }

    /// Case-insensitive match on name, specialty or document number.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }

        [
            self.display_name(),
            self.especialidad.clone(),
            self.document_number().map(str::to_string),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Reads strings, numbers and booleans as text; `null` as absent.
pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    })
}
