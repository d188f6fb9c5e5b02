//! Settlement calculators: one provider at a time, or a batch over many.
//!
//! Calculators own ephemeral state only (aggregation results, bonuses, the
//! batch working set). Persisted settlements come back from the backend and
//! are never built here.

pub mod batch;
pub mod single;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use batch::{BatchCalculator, BatchCreation, BatchEntry, BatchSelection, CombinedLine};
pub use single::{CalculationState, SettlementCalculator, SettlementForm};

/// Shared flag telling an in-flight operation whether its owner still exists.
///
/// The owner keeps one handle and calls [`Liveness::tear_down`] when it goes
/// away; operations check [`Liveness::is_alive`] before writing results back.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Default for Liveness {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn tear_down(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{
        AggregationResult, AppointmentLine, AppointmentSummary, NewSettlement, ProviderRef,
        Settlement, SettlementAppointments,
    };
    use crate::services::SettlementBackend;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use service_core::http::RemoteError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory backend with scripted answers and a record of every call.
    #[derive(Default)]
    pub struct FakeBackend {
        pub aggregations: Mutex<HashMap<i64, Result<AggregationResult, RemoteError>>>,
        pub failing_creations: Mutex<Vec<i64>>,
        pub detail: Mutex<Option<Result<SettlementAppointments, RemoteError>>>,
        pub compute_calls: Mutex<Vec<i64>>,
        pub created: Mutex<Vec<NewSettlement>>,
    }

    impl FakeBackend {
        pub fn with_aggregation(self, provider_id: i64, result: AggregationResult) -> Self {
            self.aggregations.lock().unwrap().insert(provider_id, Ok(result));
            self
        }

        pub fn with_failure(self, provider_id: i64, status: u16) -> Self {
            self.aggregations
                .lock()
                .unwrap()
                .insert(provider_id, Err(RemoteError::from_response(status, "")));
            self
        }

        pub fn failing_creation_for(self, provider_id: i64) -> Self {
            self.failing_creations.lock().unwrap().push(provider_id);
            self
        }

        pub fn compute_calls(&self) -> Vec<i64> {
            self.compute_calls.lock().unwrap().clone()
        }

        pub fn created(&self) -> Vec<NewSettlement> {
            self.created.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SettlementBackend for FakeBackend {
        async fn compute_completed_appointments(
            &self,
            provider_id: i64,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<AggregationResult, RemoteError> {
            self.compute_calls.lock().unwrap().push(provider_id);
            self.aggregations
                .lock()
                .unwrap()
                .get(&provider_id)
                .cloned()
                .unwrap_or_else(|| Ok(AggregationResult::default()))
        }

        async fn create_automatic_settlement(
            &self,
            payload: &NewSettlement,
        ) -> Result<Settlement, RemoteError> {
            self.created.lock().unwrap().push(payload.clone());
            if self
                .failing_creations
                .lock()
                .unwrap()
                .contains(&payload.manicurista_id)
            {
                return Err(RemoteError::from_response(
                    400,
                    r#"{"error": "Settlement already exists for this period"}"#,
                ));
            }
            Ok(Settlement {
                id: 100 + payload.manicurista_id,
                manicurista: ProviderRef::Id(payload.manicurista_id),
                fecha_inicio: payload.fecha_inicio,
                fecha_final: payload.fecha_final,
                valor: payload.valor,
                bonificacion: payload.bonificacion,
                total_a_pagar: payload.total(),
                cantidad_servicios_completados: 0,
                total_servicios_completados: Decimal::ZERO,
                observaciones: Some(payload.observaciones.clone()),
                fecha_creacion: None,
                estado: Some("pendiente".to_string()),
            })
        }

        async fn get_appointment_detail(
            &self,
            _settlement_id: i64,
        ) -> Result<SettlementAppointments, RemoteError> {
            self.detail
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(SettlementAppointments::default()))
        }
    }

    pub fn aggregation(count: u32, revenue: i64, suggested: &str, lines: usize) -> AggregationResult {
        let suggested: Decimal = suggested.parse().unwrap();
        AggregationResult {
            resumen_citas: AppointmentSummary {
                cantidad_citas: count,
                total_citas_completadas: Decimal::from(revenue),
                comision_50_porciento: Decimal::from(revenue) / Decimal::from(2),
            },
            valor_sugerido_liquidacion: suggested,
            citas_detalle: (0..lines)
                .map(|i| AppointmentLine {
                    id: Some(i as i64 + 1),
                    fecha: Some("2024-03-05".to_string()),
                    hora: Some(format!("{:02}:00", 9 + i)),
                    cliente: Some(crate::models::aggregation::NamedRef::Name(format!(
                        "Client {}",
                        i + 1
                    ))),
                    servicios: Some(crate::models::aggregation::ServiceList::One(
                        "Manicure".to_string(),
                    )),
                    precio_total: Decimal::from(25000),
                })
                .collect(),
        }
    }

    pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }
}
