use crate::error::ValidationError;
use crate::models::dates::{calendar_date, parse_calendar_date};
use crate::models::money::{lenient_decimal, round2};
use crate::models::provider::{Provider, PROVIDER_PLACEHOLDER};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The settlement's provider: a bare id until enriched, then an embedded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderRef {
    Id(i64),
    Embedded(Provider),
}

impl ProviderRef {
    pub fn id(&self) -> i64 {
        match self {
            ProviderRef::Id(id) => *id,
            ProviderRef::Embedded(provider) => provider.id,
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            ProviderRef::Id(_) => None,
            ProviderRef::Embedded(provider) => provider.display_name(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStatus {
    Pending,
    Paid,
    Other,
}

/// A persisted settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: i64,
    pub manicurista: ProviderRef,
    #[serde(with = "calendar_date")]
    pub fecha_inicio: NaiveDate,
    #[serde(with = "calendar_date")]
    pub fecha_final: NaiveDate,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub valor: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub bonificacion: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_a_pagar: Decimal,
    #[serde(default)]
    pub cantidad_servicios_completados: u32,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_servicios_completados: Decimal,
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default)]
    pub fecha_creacion: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
}

impl Settlement {
    pub fn provider_id(&self) -> i64 {
        self.manicurista.id()
    }

    pub fn provider_name(&self) -> String {
        self.manicurista
            .name()
            .unwrap_or_else(|| PROVIDER_PLACEHOLDER.to_string())
    }

    pub fn creation_date(&self) -> Option<NaiveDate> {
        self.fecha_creacion
            .as_deref()
            .and_then(|raw| parse_calendar_date(raw).ok())
    }

    /// Revenue plus bonus, before the 50% split.
    pub fn subtotal(&self) -> Decimal {
        round2(self.total_servicios_completados + self.bonificacion)
    }

    pub fn status(&self) -> SettlementStatus {
        match self.estado.as_deref().map(str::to_lowercase).as_deref() {
            Some("pendiente") | Some("pending") => SettlementStatus::Pending,
            Some("pagado") | Some("pagada") | Some("paid") => SettlementStatus::Paid,
            _ => SettlementStatus::Other,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        self.observaciones
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Body of a create request. Amounts are rounded to cents by [`NewSettlement::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSettlement {
    pub manicurista_id: i64,
    #[serde(with = "calendar_date")]
    pub fecha_inicio: NaiveDate,
    #[serde(with = "calendar_date")]
    pub fecha_final: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub bonificacion: Decimal,
    pub observaciones: String,
}

impl NewSettlement {
    pub fn new(
        provider_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        value: Decimal,
        bonus: Decimal,
        notes: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        if start > end {
            errors.add("fecha_final", "End date must be on or after the start date");
        }
        if value < Decimal::ZERO {
            errors.add("valor", "Value cannot be negative");
        }
        if bonus < Decimal::ZERO {
            errors.add("bonificacion", "Bonus cannot be negative");
        }
        errors.into_result()?;

        Ok(Self {
            manicurista_id: provider_id,
            fecha_inicio: start,
            fecha_final: end,
            valor: round2(value),
            bonificacion: round2(bonus),
            observaciones: notes.into(),
        })
    }

    pub fn total(&self) -> Decimal {
        round2(self.valor + self.bonificacion)
    }
}

/// Partial update. Only value, bonus and notes are editable; period and
/// provider are fixed once a settlement exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettlementUpdate {
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub valor: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub bonificacion: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observaciones: Option<String>,
}

impl SettlementUpdate {
    pub fn new(
        value: Option<Decimal>,
        bonus: Option<Decimal>,
        notes: Option<String>,
    ) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::default();
        if value.is_some_and(|v| v < Decimal::ZERO) {
            errors.add("valor", "Value cannot be negative");
        }
        if bonus.is_some_and(|b| b < Decimal::ZERO) {
            errors.add("bonificacion", "Bonus cannot be negative");
        }
        if value.is_none() && bonus.is_none() && notes.is_none() {
            errors.add("update", "Nothing to update");
        }
        errors.into_result()?;

        Ok(Self {
            valor: value.map(round2),
            bonificacion: bonus.map(round2),
            observaciones: notes,
        })
    }
}

/// Filters accepted by the settlement list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettlementFilters {
    #[serde(rename = "manicurista", skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<i64>,
    #[serde(
        rename = "fecha_inicio",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_date"
    )]
    pub period_start: Option<NaiveDate>,
}

fn serialize_optional_date<S: serde::Serializer>(
    date: &Option<NaiveDate>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => calendar_date::serialize(date, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn d(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    fn ymd(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn decodes_settlement_with_bare_provider_id() {
        let settlement: Settlement = serde_json::from_value(json!({
            "id": 12,
            "manicurista": 3,
            "fecha_inicio": "2024-03-04",
            "fecha_final": "2024-03-10",
            "valor": "75000.00",
            "bonificacion": null,
            "total_a_pagar": "75000.00",
            "cantidad_servicios_completados": 3,
            "total_servicios_completados": "150000.00",
            "observaciones": "",
            "fecha_creacion": "2024-03-11T09:15:00Z",
            "estado": "pendiente"
        }))
        .unwrap();

        assert_eq!(settlement.provider_id(), 3);
        assert_eq!(settlement.provider_name(), PROVIDER_PLACEHOLDER);
        assert_eq!(settlement.bonificacion, Decimal::ZERO);
        assert_eq!(settlement.creation_date(), Some(ymd(2024, 3, 11)));
        assert_eq!(settlement.status(), SettlementStatus::Pending);
        assert_eq!(settlement.notes(), None);
        assert_eq!(settlement.subtotal(), d("150000"));
    }

    #[test]
    fn decodes_settlement_with_embedded_provider() {
        let settlement: Settlement = serde_json::from_value(json!({
            "id": 1,
            "manicurista": {"id": 3, "nombres": "Ana", "apellidos": "Pérez"},
            "fecha_inicio": "2024-03-04",
            "fecha_final": "2024-03-10",
            "estado": "PAGADO"
        }))
        .unwrap();

        assert_eq!(settlement.provider_id(), 3);
        assert_eq!(settlement.provider_name(), "Ana Pérez");
        assert_eq!(settlement.status(), SettlementStatus::Paid);
    }

    #[test]
    fn new_settlement_rounds_and_serialises_numbers() {
        let payload = NewSettlement::new(
            3,
            ymd(2024, 3, 4),
            ymd(2024, 3, 10),
            d("75000.005"),
            d("10000.004"),
            "",
        )
        .unwrap();

        assert_eq!(payload.total(), d("85000.01"));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "manicurista_id": 3,
                "fecha_inicio": "2024-03-04",
                "fecha_final": "2024-03-10",
                "valor": 75000.01,
                "bonificacion": 10000.0,
                "observaciones": ""
            })
        );
    }

    #[test]
    fn new_settlement_rejects_inverted_period_and_negative_amounts() {
        let err = NewSettlement::new(3, ymd(2024, 3, 10), ymd(2024, 3, 4), d("-1"), d("-2"), "")
            .unwrap_err();
        assert!(err.has("fecha_final"));
        assert!(err.has("valor"));
        assert!(err.has("bonificacion"));
    }

    #[test]
    fn update_only_sends_present_fields() {
        let update = SettlementUpdate::new(None, Some(d("5000.555")), None).unwrap();
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"bonificacion": 5000.56})
        );
        assert!(SettlementUpdate::new(None, None, None).is_err());
        assert!(SettlementUpdate::new(Some(d("-1")), None, None).is_err());
    }

    #[test]
    fn filters_serialise_as_query_fields() {
        let filters = SettlementFilters {
            provider_id: Some(3),
            period_start: Some(ymd(2024, 3, 4)),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&filters).unwrap(),
            json!({"manicurista": 3, "fecha_inicio": "2024-03-04"})
        );
    }
}
