//! End-to-end settlement workflow tests.
//!
//! Tests drive the settlement front end against an in-memory settlement API
//! served by a local mock server. The API keeps state between calls, so a
//! settlement created by one step is listed, paid and exported by the next.
//!
//! ## Usage
//!
//! ```bash
//! cargo test -p workflow-tests
//! ```

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use settlement_frontend::config::{ApiSettings, ExportSettings, Settings};
use settlement_frontend::notifications::Notifier;
use settlement_frontend::session::SessionContext;
use settlement_frontend::AppState;
use std::path::Path;
use std::sync::{Arc, Mutex, Once};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,workflow_tests=debug,settlement_frontend=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Debug, Clone)]
pub struct StoredProvider {
    pub id: i64,
    pub nombres: String,
    pub apellidos: String,
}

/// A completed appointment the aggregation endpoint can count.
#[derive(Debug, Clone)]
pub struct StoredAppointment {
    pub id: i64,
    pub provider_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub client: String,
    pub services: Vec<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone)]
pub struct StoredSettlement {
    pub id: i64,
    pub provider_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub value: Decimal,
    pub bonus: Decimal,
    pub notes: String,
    pub status: String,
    pub appointments: Vec<i64>,
}

#[derive(Debug, Default)]
pub struct ApiState {
    pub providers: Vec<StoredProvider>,
    pub appointments: Vec<StoredAppointment>,
    pub settlements: Vec<StoredSettlement>,
    next_id: i64,
}

impl ApiState {
    fn appointments_for(&self, provider_id: i64, start: NaiveDate, end: NaiveDate) -> Vec<&StoredAppointment> {
        self.appointments
            .iter()
            .filter(|a| a.provider_id == provider_id && a.date >= start && a.date <= end)
            .collect()
    }

    fn settlement_json(&self, s: &StoredSettlement) -> Value {
        let revenue: Decimal = self
            .appointments
            .iter()
            .filter(|a| s.appointments.contains(&a.id))
            .map(|a| a.price)
            .sum();
        json!({
            "id": s.id,
            "manicurista": s.provider_id,
            "fecha_inicio": s.start.format("%Y-%m-%d").to_string(),
            "fecha_final": s.end.format("%Y-%m-%d").to_string(),
            "valor": s.value.to_string(),
            "bonificacion": s.bonus.to_string(),
            "total_a_pagar": (s.value + s.bonus).to_string(),
            "cantidad_servicios_completados": s.appointments.len(),
            "total_servicios_completados": revenue.to_string(),
            "observaciones": s.notes,
            "fecha_creacion": "2024-03-11T09:00:00Z",
            "estado": s.status
        })
    }
}

fn appointment_json(a: &StoredAppointment) -> Value {
    json!({
        "id": a.id,
        "fecha": a.date.format("%Y-%m-%d").to_string(),
        "hora": a.time,
        "cliente": {"nombre": a.client},
        "servicios": a.services.iter().map(|s| json!({"nombre": s})).collect::<Vec<_>>(),
        "precio_total": a.price.to_string()
    })
}

fn provider_json(p: &StoredProvider) -> Value {
    json!({"id": p.id, "nombres": p.nombres, "apellidos": p.apellidos, "estado": "activo"})
}

/// Numeric segment of the path, e.g. `42` in `/api/liquidaciones/42/detalle_citas/`.
fn path_id(request: &Request) -> Option<i64> {
    request
        .url
        .path_segments()?
        .find_map(|segment| segment.parse().ok())
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"detail": "No encontrado."}))
}

#[derive(Deserialize)]
struct AggregationBody {
    manicurista_id: i64,
    fecha_inicio: NaiveDate,
    fecha_final: NaiveDate,
}

#[derive(Deserialize)]
struct CreateBody {
    manicurista_id: i64,
    fecha_inicio: NaiveDate,
    fecha_final: NaiveDate,
    valor: Decimal,
    bonificacion: Decimal,
    #[serde(default)]
    observaciones: String,
}

#[derive(Deserialize)]
struct UpdateBody {
    valor: Option<Decimal>,
    bonificacion: Option<Decimal>,
    observaciones: Option<String>,
}

type Handler = fn(&mut ApiState, &Request) -> ResponseTemplate;

/// Routes one endpoint to a handler over the shared state.
struct Route {
    state: Arc<Mutex<ApiState>>,
    handler: Handler,
}

impl Respond for Route {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        tracing::debug!(method = %request.method, path = request.url.path(), "Fake API request");
        match self.state.lock() {
            Ok(mut state) => (self.handler)(&mut state, request),
            Err(_) => ResponseTemplate::new(500),
        }
    }
}

fn list_providers(state: &mut ApiState, _: &Request) -> ResponseTemplate {
    let items: Vec<Value> = state.providers.iter().map(provider_json).collect();
    ResponseTemplate::new(200).set_body_json(json!({"count": items.len(), "results": items}))
}

fn get_provider(state: &mut ApiState, request: &Request) -> ResponseTemplate {
    match path_id(request).and_then(|id| state.providers.iter().find(|p| p.id == id)) {
        Some(provider) => ResponseTemplate::new(200).set_body_json(provider_json(provider)),
        None => not_found(),
    }
}

fn list_settlements(state: &mut ApiState, request: &Request) -> ResponseTemplate {
    let provider: Option<i64> = request
        .url
        .query_pairs()
        .find(|(key, _)| key == "manicurista")
        .and_then(|(_, value)| value.parse().ok());
    let items: Vec<Value> = state
        .settlements
        .iter()
        .filter(|s| provider.is_none_or(|id| s.provider_id == id))
        .map(|s| state.settlement_json(s))
        .collect();
    ResponseTemplate::new(200).set_body_json(items)
}

fn get_settlement(state: &mut ApiState, request: &Request) -> ResponseTemplate {
    match path_id(request).and_then(|id| state.settlements.iter().find(|s| s.id == id)) {
        Some(settlement) => ResponseTemplate::new(200).set_body_json(state.settlement_json(settlement)),
        None => not_found(),
    }
}

fn compute(state: &mut ApiState, request: &Request) -> ResponseTemplate {
    let Ok(body) = serde_json::from_slice::<AggregationBody>(&request.body) else {
        return ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid request"}));
    };
    let found = state.appointments_for(body.manicurista_id, body.fecha_inicio, body.fecha_final);
    let revenue: Decimal = found.iter().map(|a| a.price).sum();
    let commission = revenue / Decimal::TWO;
    ResponseTemplate::new(200).set_body_json(json!({
        "resumen_citas": {
            "cantidad_citas": found.len(),
            "total_citas_completadas": revenue.to_string(),
            "comision_50_porciento": commission.to_string()
        },
        "valor_sugerido_liquidacion": commission.to_string(),
        "citas_detalle": found.iter().map(|a| appointment_json(a)).collect::<Vec<_>>()
    }))
}

fn create_automatic(state: &mut ApiState, request: &Request) -> ResponseTemplate {
    let Ok(body) = serde_json::from_slice::<CreateBody>(&request.body) else {
        return ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid request"}));
    };
    let duplicate = state.settlements.iter().any(|s| {
        s.provider_id == body.manicurista_id && s.start == body.fecha_inicio && s.end == body.fecha_final
    });
    if duplicate {
        return ResponseTemplate::new(400)
            .set_body_json(json!({"error": "A settlement already exists for this period"}));
    }

    state.next_id += 1;
    let appointments = state
        .appointments_for(body.manicurista_id, body.fecha_inicio, body.fecha_final)
        .iter()
        .map(|a| a.id)
        .collect();
    let settlement = StoredSettlement {
        id: state.next_id,
        provider_id: body.manicurista_id,
        start: body.fecha_inicio,
        end: body.fecha_final,
        value: body.valor,
        bonus: body.bonificacion,
        notes: body.observaciones,
        status: "pendiente".to_string(),
        appointments,
    };
    let response = state.settlement_json(&settlement);
    state.settlements.push(settlement);
    ResponseTemplate::new(201).set_body_json(response)
}

fn update(state: &mut ApiState, request: &Request) -> ResponseTemplate {
    let Ok(body) = serde_json::from_slice::<UpdateBody>(&request.body) else {
        return ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid request"}));
    };
    let Some(index) = path_id(request).and_then(|id| state.settlements.iter().position(|s| s.id == id)) else {
        return not_found();
    };
    let settlement = &mut state.settlements[index];
    if let Some(value) = body.valor {
        settlement.value = value;
    }
    if let Some(bonus) = body.bonificacion {
        settlement.bonus = bonus;
    }
    if let Some(notes) = body.observaciones {
        settlement.notes = notes;
    }
    let response = state.settlement_json(&state.settlements[index]);
    ResponseTemplate::new(200).set_body_json(response)
}

fn mark_paid(state: &mut ApiState, request: &Request) -> ResponseTemplate {
    match path_id(request).and_then(|id| state.settlements.iter_mut().find(|s| s.id == id)) {
        Some(settlement) => {
            settlement.status = "pagado".to_string();
            ResponseTemplate::new(200).set_body_json(json!({"id": settlement.id, "estado": "pagado"}))
        }
        None => not_found(),
    }
}

fn detail(state: &mut ApiState, request: &Request) -> ResponseTemplate {
    let Some(settlement) = path_id(request).and_then(|id| state.settlements.iter().find(|s| s.id == id)) else {
        return not_found();
    };
    let lines: Vec<Value> = state
        .appointments
        .iter()
        .filter(|a| settlement.appointments.contains(&a.id))
        .map(appointment_json)
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "liquidacion": state.settlement_json(settlement),
        "citas_detalle": lines
    }))
}

/// In-memory settlement API mounted on a [`MockServer`].
#[derive(Clone, Default)]
pub struct FakeSettlementApi {
    state: Arc<Mutex<ApiState>>,
}

impl FakeSettlementApi {
    pub fn with_provider(self, id: i64, nombres: &str, apellidos: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.providers.push(StoredProvider {
                id,
                nombres: nombres.to_string(),
                apellidos: apellidos.to_string(),
            });
        }
        self
    }

    /// Add `count` completed appointments of `price` each on `date`.
    pub fn with_appointments(self, provider_id: i64, date: NaiveDate, count: usize, price: i64) -> Self {
        if let Ok(mut state) = self.state.lock() {
            for i in 0..count {
                let id = state.appointments.len() as i64 + 1;
                state.appointments.push(StoredAppointment {
                    id,
                    provider_id,
                    date,
                    time: format!("{:02}:00", 9 + i % 9),
                    client: format!("Client {}", id),
                    services: vec!["Manicure".to_string(), "Pedicure".to_string()],
                    price: Decimal::from(price),
                });
            }
        }
        self
    }

    pub fn settlements(&self) -> Vec<StoredSettlement> {
        self.state
            .lock()
            .map(|state| state.settlements.clone())
            .unwrap_or_default()
    }

    fn route(&self, handler: Handler) -> Route {
        Route {
            state: self.state.clone(),
            handler,
        }
    }

    pub async fn mount(&self, server: &MockServer) {
        let routes: [(&str, &str, bool, Handler); 9] = [
            ("GET", "/api/manicuristas/", false, list_providers),
            ("GET", r"^/api/manicuristas/\d+/$", true, get_provider),
            ("GET", "/api/liquidaciones/", false, list_settlements),
            ("POST", "/api/liquidaciones/calcular_citas_completadas/", false, compute),
            ("POST", "/api/liquidaciones/crear_liquidacion_automatica/", false, create_automatic),
            ("GET", r"^/api/liquidaciones/\d+/$", true, get_settlement),
            ("PATCH", r"^/api/liquidaciones/\d+/$", true, update),
            ("PATCH", r"^/api/liquidaciones/\d+/marcar_como_pagada/$", true, mark_paid),
            ("GET", r"^/api/liquidaciones/\d+/detalle_citas/$", true, detail),
        ];

        for (verb, route, is_regex, handler) in routes {
            let mock = if is_regex {
                Mock::given(method(verb)).and(path_regex(route))
            } else {
                Mock::given(method(verb)).and(path(route))
            };
            mock.respond_with(self.route(handler)).mount(server).await;
        }
    }
}

/// Context for workflow tests: a fake API, the front end's state wired to
/// it, and a notifier.
pub struct WorkflowTestContext {
    pub server: MockServer,
    pub api: FakeSettlementApi,
    pub state: AppState,
    pub notifier: Notifier,
}

impl WorkflowTestContext {
    pub async fn new(api: FakeSettlementApi, session: SessionContext, output_dir: &Path) -> Result<Self> {
        init_tracing();

        let server = MockServer::start().await;
        api.mount(&server).await;

        let settings = Settings {
            api: ApiSettings {
                base_url: format!("{}/api/", server.uri()),
                timeout_seconds: Some(5),
                ..ApiSettings::default()
            },
            session,
            export: ExportSettings {
                output_dir: output_dir.to_path_buf(),
                ..ExportSettings::default()
            },
            ..Settings::default()
        };
        let state = AppState::new(settings)
            .map_err(|e| anyhow!("Failed to build application state: {}", e))?;
        let notifier = state.notifier();

        Ok(Self {
            server,
            api,
            state,
            notifier,
        })
    }

    pub fn messages(&mut self) -> Vec<String> {
        self.notifier.drain().into_iter().map(|n| n.message).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn appointments_are_filtered_by_provider_and_period() {
        let api = FakeSettlementApi::default()
            .with_provider(3, "Ana", "Pérez")
            .with_appointments(3, ymd(2024, 3, 5), 2, 25000)
            .with_appointments(3, ymd(2024, 3, 12), 1, 25000)
            .with_appointments(5, ymd(2024, 3, 5), 1, 30000);

        let state = api.state.lock().unwrap();
        let found = state.appointments_for(3, ymd(2024, 3, 4), ymd(2024, 3, 10));

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|a| a.provider_id == 3));
        assert_eq!(found[1].client, "Client 2");
    }
}
