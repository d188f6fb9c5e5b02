//! Single and batch calculation flows driven through the real client.

mod common;

use common::{admin_client, aggregation_json, provider_json, setup, ymd, SETTLEMENTS};
use rust_decimal::Decimal;
use serde_json::json;
use settlement_frontend::calculator::{
    BatchCalculator, CalculationState, Liveness, SettlementCalculator,
};
use settlement_frontend::error::SettlementError;
use settlement_frontend::models::Provider;
use settlement_frontend::notifications::{NotificationKind, Notifier};
use std::str::FromStr;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn d(raw: &str) -> Decimal {
    Decimal::from_str(raw).unwrap()
}

fn provider(id: i64, name: &str) -> Provider {
    serde_json::from_value(provider_json(id, name, "Test")).unwrap()
}

fn created_json(id: i64, provider_id: i64, valor: f64, bonus: f64) -> serde_json::Value {
    json!({
        "id": id,
        "manicurista": provider_id,
        "fecha_inicio": "2024-03-04",
        "fecha_final": "2024-03-10",
        "valor": valor,
        "bonificacion": bonus,
        "total_a_pagar": valor + bonus,
        "estado": "pendiente"
    })
}

#[tokio::test]
async fn calculate_then_create_posts_rounded_amounts() {
    let server = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("{}calcular_citas_completadas/", SETTLEMENTS)))
        .and(body_json(json!({
            "manicurista_id": 3,
            "fecha_inicio": "2024-03-04",
            "fecha_final": "2024-03-10"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(aggregation_json(3, "37500.004")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}crear_liquidacion_automatica/", SETTLEMENTS)))
        .and(body_json(json!({
            "manicurista_id": 3,
            "fecha_inicio": "2024-03-04",
            "fecha_final": "2024-03-10",
            "valor": 37500.0,
            "bonificacion": 5000.56,
            "observaciones": "March, first week"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created_json(21, 3, 37500.0, 5000.56)))
        .expect(1)
        .mount(&server)
        .await;

    let client = admin_client(&server);
    let mut notifier = Notifier::default();
    let mut calc = SettlementCalculator::new(provider(3, "Ana"), ymd(2024, 3, 6), Liveness::new());

    let result = calc.calculate(&client, &mut notifier).await.unwrap();
    assert_eq!(result.appointment_count(), 3);
    assert_eq!(result.citas_detalle[0].service_names(), "Manicure, Nail art");
    assert_eq!(calc.form().value, d("37500.00"));

    calc.set_bonus(Some(d("5000.555")));
    calc.set_notes("March, first week");
    assert_eq!(calc.total(), d("42500.56"));

    let created = calc.create(&client, &mut notifier).await.unwrap();
    assert_eq!(created.id, 21);
    assert_eq!(calc.state(), &CalculationState::Idle);

    let kinds: Vec<_> = notifier.drain().into_iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NotificationKind::Success, NotificationKind::Success]);
}

#[tokio::test]
async fn duplicate_period_rejection_is_shown_to_the_user() {
    let server = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("{}calcular_citas_completadas/", SETTLEMENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(aggregation_json(1, "12500")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}crear_liquidacion_automatica/", SETTLEMENTS)))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "A settlement already exists for this period"
        })))
        .mount(&server)
        .await;

    let client = admin_client(&server);
    let mut notifier = Notifier::default();
    let mut calc = SettlementCalculator::new(provider(3, "Ana"), ymd(2024, 3, 6), Liveness::new());
    calc.calculate(&client, &mut notifier).await.unwrap();

    let err = calc.create(&client, &mut notifier).await.unwrap_err();

    assert!(matches!(err, SettlementError::Remote(_)));
    assert_eq!(err.user_message(), "A settlement already exists for this period");
    let last = notifier.drain().pop().unwrap();
    assert_eq!(last.kind, NotificationKind::Error);
    assert_eq!(last.message, "Error: A settlement already exists for this period");
    // The calculated value stays so the user can retry.
    assert_eq!(calc.form().value, d("12500"));
}

#[tokio::test]
async fn batch_records_failures_per_row_and_creates_only_rows_with_services() {
    let server = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("{}calcular_citas_completadas/", SETTLEMENTS)))
        .and(body_json(json!({"manicurista_id": 3, "fecha_inicio": "2024-03-04", "fecha_final": "2024-03-10"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(aggregation_json(2, "25000")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}calcular_citas_completadas/", SETTLEMENTS)))
        .and(body_json(json!({"manicurista_id": 5, "fecha_inicio": "2024-03-04", "fecha_final": "2024-03-10"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(aggregation_json(0, "0")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}calcular_citas_completadas/", SETTLEMENTS)))
        .and(body_json(json!({"manicurista_id": 7, "fecha_inicio": "2024-03-04", "fecha_final": "2024-03-10"})))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}crear_liquidacion_automatica/", SETTLEMENTS)))
        .and(body_json(json!({
            "manicurista_id": 3,
            "fecha_inicio": "2024-03-04",
            "fecha_final": "2024-03-10",
            "valor": 25000.0,
            "bonificacion": 2000.0,
            "observaciones": "Global settlement - week of 04/03/2024 to 10/03/2024"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created_json(30, 3, 25000.0, 2000.0)))
        .expect(1)
        .mount(&server)
        .await;

    let client = admin_client(&server);
    let mut notifier = Notifier::default();
    let mut batch = BatchCalculator::new(ymd(2024, 3, 6), Liveness::new());
    for p in [provider(3, "Ana"), provider(5, "Luisa"), provider(7, "Marta")] {
        batch.selection_mut().toggle(p);
    }

    let entries = batch.calculate_all(&client, &mut notifier).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(!entries[0].has_error());
    assert_eq!(entries[1].appointment_count(), 0);
    assert_eq!(entries[2].error.as_deref(), Some("Internal server error"));
    assert_eq!(batch.combined_lines().len(), 2);
    assert_eq!(batch.search("client 2").len(), 1);

    batch.update_bonus(3, d("2000")).unwrap();
    assert_eq!(batch.batch_total(), d("27000"));

    let creation = batch.create_all(&client, &mut notifier).await.unwrap();
    assert_eq!(creation.created.len(), 1);
    assert_eq!(creation.excluded, 2);
    assert!(batch.entries().is_empty());

    let messages: Vec<_> = notifier.drain().into_iter().map(|n| n.message).collect();
    assert!(messages.contains(&"Global settlements calculated - 2 services found".to_string()));
    assert!(messages.contains(&"1 providers could not be calculated".to_string()));
    assert!(messages.contains(&"2 settlements without services were skipped".to_string()));
    assert!(messages.contains(&"1 settlements with services created successfully".to_string()));
}

#[tokio::test]
async fn batch_creation_failure_keeps_the_review_rows() {
    let server = setup().await;
    Mock::given(method("POST"))
        .and(path(format!("{}calcular_citas_completadas/", SETTLEMENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(aggregation_json(1, "12500")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}crear_liquidacion_automatica/", SETTLEMENTS)))
        .and(body_json(json!({
            "manicurista_id": 3,
            "fecha_inicio": "2024-03-04",
            "fecha_final": "2024-03-10",
            "valor": 12500.0,
            "bonificacion": 0.0,
            "observaciones": "Global settlement - week of 04/03/2024 to 10/03/2024"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(created_json(31, 3, 12500.0, 0.0)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}crear_liquidacion_automatica/", SETTLEMENTS)))
        .and(body_json(json!({
            "manicurista_id": 5,
            "fecha_inicio": "2024-03-04",
            "fecha_final": "2024-03-10",
            "valor": 12500.0,
            "bonificacion": 0.0,
            "observaciones": "Global settlement - week of 04/03/2024 to 10/03/2024"
        })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Duplicate settlement"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = admin_client(&server);
    let mut notifier = Notifier::default();
    let mut batch = BatchCalculator::new(ymd(2024, 3, 6), Liveness::new());
    batch.selection_mut().toggle(provider(3, "Ana"));
    batch.selection_mut().toggle(provider(5, "Luisa"));
    batch.calculate_all(&client, &mut notifier).await.unwrap();

    let err = batch.create_all(&client, &mut notifier).await.unwrap_err();

    assert_eq!(err.user_message(), "Duplicate settlement");
    assert_eq!(batch.entries().len(), 2);
    let last = notifier.drain().pop().unwrap();
    assert_eq!(last.message, "Error creating global settlements: Duplicate settlement");
}
