//! Typed access to the remote settlement and provider resources.

use crate::config::{ApiSettings, Settings};
use crate::models::dates::calendar_date;
use crate::models::provider::PROVIDER_PLACEHOLDER;
use crate::models::{
    AggregationResult, NewSettlement, Provider, ProviderRef, Settlement, SettlementAppointments,
    SettlementFilters, SettlementUpdate,
};
use crate::services::SettlementBackend;
use crate::session::SessionContext;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;
use service_core::fanout::join_all_settled;
use service_core::http::{ListEnvelope, RemoteError, RestClient};
use std::collections::{BTreeSet, HashMap};
use tracing::instrument;

const SETTLEMENTS_KEY: &str = "liquidaciones";
const PROVIDERS_KEY: &str = "manicuristas";

#[derive(Debug, Serialize)]
struct AggregationRequest {
    manicurista_id: i64,
    #[serde(with = "calendar_date")]
    fecha_inicio: NaiveDate,
    #[serde(with = "calendar_date")]
    fecha_final: NaiveDate,
}

#[derive(Clone)]
pub struct SettlementClient {
    rest: RestClient,
    settlements_path: String,
    providers_path: String,
    session: SessionContext,
}

impl SettlementClient {
    pub fn new(rest: RestClient, api: &ApiSettings, session: SessionContext) -> Self {
        Self {
            rest,
            settlements_path: api.settlements_path.clone(),
            providers_path: api.providers_path.clone(),
            session,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let rest = RestClient::new(settings.api.rest_client_config())?;
        Ok(Self::new(rest, &settings.api, settings.session.clone()))
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn settlements(&self, suffix: &str) -> String {
        join_path(&self.settlements_path, suffix)
    }

    fn providers(&self, suffix: &str) -> String {
        join_path(&self.providers_path, suffix)
    }

    /// List settlements, embedding provider names where the backend only sent an id.
    #[instrument(skip(self, filters), fields(provider_id = ?filters.provider_id))]
    pub async fn list_settlements(
        &self,
        filters: &SettlementFilters,
    ) -> Result<Vec<Settlement>, RemoteError> {
        let filters = self.session.scope_filters(filters.clone());
        let raw: Value = self.rest.get(&self.settlements(""), &filters).await?;
        let settlements = decode_list(raw, SETTLEMENTS_KEY)?;
        Ok(self.enrich(settlements).await)
    }

    #[instrument(skip(self))]
    pub async fn get_settlement(&self, id: i64) -> Result<Settlement, RemoteError> {
        let settlement: Settlement = self
            .rest
            .get(&self.settlements(&format!("{}/", id)), &())
            .await?;
        let mut enriched = self.enrich(vec![settlement]).await;
        enriched
            .pop()
            .ok_or_else(|| RemoteError::decode(200, "settlement lost during enrichment"))
    }

    /// Manual creation with caller-supplied amounts.
    #[instrument(skip(self, payload), fields(provider_id = payload.manicurista_id))]
    pub async fn create_settlement(&self, payload: &NewSettlement) -> Result<Settlement, RemoteError> {
        self.rest.post(&self.settlements(""), payload).await
    }

    #[instrument(skip(self, update))]
    pub async fn update_settlement(
        &self,
        id: i64,
        update: &SettlementUpdate,
    ) -> Result<Settlement, RemoteError> {
        self.rest
            .patch(&self.settlements(&format!("{}/", id)), update)
            .await
    }

    #[instrument(skip(self))]
    pub async fn mark_as_paid(&self, id: i64) -> Result<Value, RemoteError> {
        self.rest
            .patch_empty(&self.settlements(&format!("{}/marcar_como_pagada/", id)))
            .await
    }

    #[instrument(skip(self))]
    pub async fn recompute_appointments(&self, id: i64) -> Result<Value, RemoteError> {
        self.rest
            .post_empty(&self.settlements(&format!("{}/recalcular_citas_completadas/", id)))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_settlements_by_provider(
        &self,
        provider_id: i64,
    ) -> Result<Vec<Settlement>, RemoteError> {
        let provider_id = self.session.scoped_provider().unwrap_or(provider_id);
        let raw: Value = self
            .rest
            .get(&self.settlements("por_manicurista/"), &[("id", provider_id)])
            .await?;
        let settlements = decode_list(raw, SETTLEMENTS_KEY)?;
        Ok(self.enrich(settlements).await)
    }

    #[instrument(skip(self))]
    pub async fn get_pending_settlements(&self) -> Result<Vec<Settlement>, RemoteError> {
        let raw: Value = self.rest.get(&self.settlements("pendientes/"), &()).await?;
        let mut settlements: Vec<Settlement> = decode_list(raw, SETTLEMENTS_KEY)?;
        if let Some(own) = self.session.scoped_provider() {
            settlements.retain(|s| s.provider_id() == own);
        }
        Ok(self.enrich(settlements).await)
    }

    /// Backend-defined statistics object, passed through untouched.
    #[instrument(skip(self))]
    pub async fn get_general_statistics(&self) -> Result<Value, RemoteError> {
        self.rest
            .get(&self.settlements("estadisticas_generales/"), &())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_settlement(&self, id: i64) -> Result<(), RemoteError> {
        self.rest.delete(&self.settlements(&format!("{}/", id))).await
    }

    #[instrument(skip(self))]
    pub async fn get_provider(&self, id: i64) -> Result<Provider, RemoteError> {
        self.rest.get(&self.providers(&format!("{}/", id)), &()).await
    }

    #[instrument(skip(self))]
    pub async fn list_available_providers(&self) -> Result<Vec<Provider>, RemoteError> {
        let raw: Value = self.rest.get(&self.providers(""), &()).await?;
        let providers = decode_list(raw, PROVIDERS_KEY)?;
        Ok(self.session.scope_providers(providers))
    }

    /// Replace bare provider ids with `{id, nombre}`. Each distinct id is
    /// fetched once, all of them concurrently; a failed lookup yields the
    /// placeholder name and never drops the settlement.
    async fn enrich(&self, settlements: Vec<Settlement>) -> Vec<Settlement> {
        let missing: BTreeSet<i64> = settlements
            .iter()
            .filter_map(|s| match s.manicurista {
                ProviderRef::Id(id) => Some(id),
                ProviderRef::Embedded(_) => None,
            })
            .collect();

        if missing.is_empty() {
            return settlements;
        }

        let lookups = join_all_settled(missing.iter().map(|&id| self.get_provider(id))).await;
        let names: HashMap<i64, String> = missing
            .iter()
            .zip(lookups)
            .map(|(&id, lookup)| {
                let name = match lookup {
                    Ok(provider) => provider.display_name_or_placeholder(),
                    Err(err) => {
                        tracing::warn!(
                            provider_id = id,
                            status = ?err.status,
                            error = %err.detail,
                            "Provider lookup failed; using placeholder name"
                        );
                        PROVIDER_PLACEHOLDER.to_string()
                    }
                };
                (id, name)
            })
            .collect();

        settlements
            .into_iter()
            .map(|mut settlement| {
                if let ProviderRef::Id(id) = settlement.manicurista {
                    let name = names
                        .get(&id)
                        .cloned()
                        .unwrap_or_else(|| PROVIDER_PLACEHOLDER.to_string());
                    settlement.manicurista = ProviderRef::Embedded(Provider::summary(id, name));
                }
                settlement
            })
            .collect()
    }
}

#[async_trait]
impl SettlementBackend for SettlementClient {
    #[instrument(skip(self))]
    async fn compute_completed_appointments(
        &self,
        provider_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AggregationResult, RemoteError> {
        let request = AggregationRequest {
            manicurista_id: provider_id,
            fecha_inicio: start,
            fecha_final: end,
        };
        self.rest
            .post(&self.settlements("calcular_citas_completadas/"), &request)
            .await
    }

    /// `valor` and `bonificacion` are already rounded by [`NewSettlement::new`].
    #[instrument(skip(self, payload), fields(provider_id = payload.manicurista_id))]
    async fn create_automatic_settlement(
        &self,
        payload: &NewSettlement,
    ) -> Result<Settlement, RemoteError> {
        self.rest
            .post(&self.settlements("crear_liquidacion_automatica/"), payload)
            .await
    }

    #[instrument(skip(self))]
    async fn get_appointment_detail(
        &self,
        settlement_id: i64,
    ) -> Result<SettlementAppointments, RemoteError> {
        self.rest
            .get(&self.settlements(&format!("{}/detalle_citas/", settlement_id)), &())
            .await
    }
}

fn join_path(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), suffix.trim_start_matches('/'))
}

/// Decode a list response through the envelope decoder; shape errors become
/// decode failures of the call.
fn decode_list<T: DeserializeOwned>(raw: Value, resource_key: &str) -> Result<Vec<T>, RemoteError> {
    let envelope = ListEnvelope::decode(raw, resource_key).map_err(|e| {
        tracing::error!(resource = resource_key, error = %e, "Unexpected list response");
        RemoteError::decode(200, e)
    })?;

    tracing::debug!(resource = resource_key, count = envelope.len(), "Decoded list response");

    envelope.into_typed().map_err(|e| {
        tracing::error!(resource = resource_key, error = %e, "List item could not be decoded");
        RemoteError::decode(200, e)
    })
}
