//! Settlement ("liquidaciones") front end for salon service providers:
//! typed access to the settlement API, single and batch calculators, and PDF
//! export.

pub mod board;
pub mod calculator;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod notifications;
pub mod services;
pub mod session;

use config::Settings;
use export::SettlementExporter;
use notifications::Notifier;
use service_core::error::AppError;
use services::SettlementClient;
use std::sync::Arc;

/// Shared application state containing the service client and exporter
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<SettlementClient>,
    pub exporter: Arc<SettlementExporter>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let client = SettlementClient::from_settings(&settings)?;
        let exporter = SettlementExporter::new(settings.export.clone());
        Ok(Self {
            client: Arc::new(client),
            exporter: Arc::new(exporter),
            settings: Arc::new(settings),
        })
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::new(self.settings.notifications.dedup_window())
    }
}
