//! Shared fixtures for the HTTP-level tests: a mock backend and JSON bodies
//! shaped like the settlement API's responses.

#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{json, Value};
use service_core::http::{RestClient, RestClientConfig};
use settlement_frontend::config::ApiSettings;
use settlement_frontend::services::SettlementClient;
use settlement_frontend::session::SessionContext;
use wiremock::MockServer;

pub const SETTLEMENTS: &str = "/api/liquidaciones/";
pub const PROVIDERS: &str = "/api/manicuristas/";

pub async fn setup() -> MockServer {
    MockServer::start().await
}

pub fn client_for(server: &MockServer, session: SessionContext) -> SettlementClient {
    let api = ApiSettings {
        base_url: format!("{}/api/", server.uri()),
        ..ApiSettings::default()
    };
    let rest = RestClient::new(RestClientConfig {
        timeout: Some(std::time::Duration::from_secs(5)),
        ..api.rest_client_config()
    })
    .expect("Failed to build REST client");
    SettlementClient::new(rest, &api, session)
}

pub fn admin_client(server: &MockServer) -> SettlementClient {
    client_for(server, SessionContext::admin())
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// A settlement row as the list endpoint returns it, provider as a bare id.
pub fn settlement_json(id: i64, provider_id: i64, estado: &str) -> Value {
    json!({
        "id": id,
        "manicurista": provider_id,
        "fecha_inicio": "2024-03-04",
        "fecha_final": "2024-03-10",
        "valor": "75000.00",
        "bonificacion": "10000.00",
        "total_a_pagar": "85000.00",
        "cantidad_servicios_completados": 3,
        "total_servicios_completados": "150000.00",
        "observaciones": "",
        "fecha_creacion": "2024-03-11T09:15:00Z",
        "estado": estado
    })
}

pub fn provider_json(id: i64, nombres: &str, apellidos: &str) -> Value {
    json!({
        "id": id,
        "nombres": nombres,
        "apellidos": apellidos,
        "especialidad": "Manicure",
        "estado": "activo"
    })
}

/// `count` appointment lines of 25 000 each, one per client.
pub fn appointment_lines(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| {
            json!({
                "id": i,
                "fecha": "2024-03-05",
                "hora": "10:30:00",
                "cliente": {"nombre": format!("Client {}", i)},
                "servicios": [{"nombre": "Manicure"}, {"nombre": "Nail art"}],
                "precio_total": "25000.00"
            })
        })
        .collect()
}

pub fn aggregation_json(count: usize, suggested: &str) -> Value {
    let revenue = 25000 * count as i64;
    json!({
        "resumen_citas": {
            "cantidad_citas": count,
            "total_citas_completadas": revenue,
            "comision_50_porciento": revenue / 2
        },
        "valor_sugerido_liquidacion": suggested,
        "citas_detalle": appointment_lines(count)
    })
}
