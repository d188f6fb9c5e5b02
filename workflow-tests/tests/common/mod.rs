//! Common test utilities for workflow tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use settlement_frontend::session::SessionContext;
use std::path::Path;
use workflow_tests::{FakeSettlementApi, WorkflowTestContext};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Two providers; Ana has three completed appointments in the week of
/// 2024-03-04 and one the week after, Luisa has none.
pub fn salon() -> FakeSettlementApi {
    FakeSettlementApi::default()
        .with_provider(3, "Ana", "Pérez")
        .with_provider(5, "Luisa", "Gómez")
        .with_appointments(3, ymd(2024, 3, 5), 3, 50000)
        .with_appointments(3, ymd(2024, 3, 12), 1, 40000)
}

/// Create a workflow context over `api` for an admin session.
pub async fn setup(api: FakeSettlementApi, output_dir: &Path) -> WorkflowTestContext {
    setup_as(api, SessionContext::admin(), output_dir).await
}

pub async fn setup_as(
    api: FakeSettlementApi,
    session: SessionContext,
    output_dir: &Path,
) -> WorkflowTestContext {
    WorkflowTestContext::new(api, session, output_dir)
        .await
        .expect("Failed to create workflow test context")
}
