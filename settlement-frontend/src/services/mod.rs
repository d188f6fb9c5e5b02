pub mod settlement_client;

use crate::models::{AggregationResult, NewSettlement, Settlement, SettlementAppointments};
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::http::RemoteError;

pub use settlement_client::SettlementClient;

/// Remote operations the calculators and the exporter depend on.
#[async_trait]
pub trait SettlementBackend: Send + Sync {
    async fn compute_completed_appointments(
        &self,
        provider_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AggregationResult, RemoteError>;

    async fn create_automatic_settlement(
        &self,
        payload: &NewSettlement,
    ) -> Result<Settlement, RemoteError>;

    async fn get_appointment_detail(
        &self,
        settlement_id: i64,
    ) -> Result<SettlementAppointments, RemoteError>;
}
