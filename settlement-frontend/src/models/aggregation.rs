//! Result of aggregating a provider's completed appointments over a period.

use crate::models::dates::display_raw_date;
use crate::models::money::{lenient_decimal, round2};
use crate::models::provider::lenient_text;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const CLIENT_PLACEHOLDER: &str = "Client unavailable";
pub const SERVICE_PLACEHOLDER: &str = "Service";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentSummary {
    #[serde(default)]
    pub cantidad_citas: u32,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub total_citas_completadas: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub comision_50_porciento: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    #[serde(default)]
    pub resumen_citas: AppointmentSummary,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub valor_sugerido_liquidacion: Decimal,
    #[serde(default)]
    pub citas_detalle: Vec<AppointmentLine>,
}

impl AggregationResult {
    pub fn appointment_count(&self) -> u32 {
        self.resumen_citas.cantidad_citas
    }

    pub fn revenue(&self) -> Decimal {
        self.resumen_citas.total_citas_completadas
    }

    pub fn commission(&self) -> Decimal {
        self.resumen_citas.comision_50_porciento
    }

    /// Suggested settlement value, rounded to cents.
    pub fn suggested_value(&self) -> Decimal {
        round2(self.valor_sugerido_liquidacion)
    }

    pub fn has_services(&self) -> bool {
        self.appointment_count() > 0
    }
}

/// Per-appointment detail returned by the aggregation and detail endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub fecha: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub hora: Option<String>,
    #[serde(default)]
    pub cliente: Option<NamedRef>,
    #[serde(default)]
    pub servicios: Option<ServiceList>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub precio_total: Decimal,
}

/// Either a bare name or an object carrying `nombre`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamedRef {
    Name(String),
    Record {
        #[serde(default)]
        nombre: Option<String>,
    },
}

impl NamedRef {
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            NamedRef::Name(name) => Some(name.as_str()),
            NamedRef::Record { nombre } => nombre.as_deref(),
        };
        name.map(str::trim).filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceList {
    Many(Vec<NamedRef>),
    One(String),
}

impl AppointmentLine {
    pub fn client_name(&self) -> String {
        self.cliente
            .as_ref()
            .and_then(NamedRef::name)
            .unwrap_or(CLIENT_PLACEHOLDER)
            .to_string()
    }

    /// Service names joined with `, `.
    pub fn service_names(&self) -> String {
        let names = match &self.servicios {
            Some(ServiceList::Many(items)) => items
                .iter()
                .filter_map(NamedRef::name)
                .collect::<Vec<_>>()
                .join(", "),
            Some(ServiceList::One(name)) => name.trim().to_string(),
            None => String::new(),
        };

        if names.is_empty() {
            SERVICE_PLACEHOLDER.to_string()
        } else {
            names
        }
    }

    pub fn display_date(&self) -> String {
        self.fecha.as_deref().map(display_raw_date).unwrap_or_default()
    }

    pub fn display_time(&self) -> String {
        self.hora.clone().unwrap_or_default()
    }

    pub fn price(&self) -> Decimal {
        round2(self.precio_total)
    }
}

/// Detail payload of a persisted settlement: only the appointment list is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementAppointments {
    #[serde(default)]
    pub citas_detalle: Vec<AppointmentLine>,
}
