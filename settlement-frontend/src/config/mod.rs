use crate::export::{PageFormat, RendererChoice};
use crate::session::SessionContext;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{configuration_directory, load_settings};
use service_core::error::AppError;
use service_core::http::RestClientConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionContext,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    /// Root of the REST API, e.g. `http://127.0.0.1:8000/api/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_settlements_path")]
    pub settlements_path: String,
    #[serde(default = "default_providers_path")]
    pub providers_path: String,
    /// Sent as a bearer token when present.
    #[serde(default)]
    pub access_token: Option<Secret<String>>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            settlements_path: default_settlements_path(),
            providers_path: default_providers_path(),
            access_token: None,
            timeout_seconds: None,
        }
    }
}

impl ApiSettings {
    pub fn rest_client_config(&self) -> RestClientConfig {
        RestClientConfig {
            base_url: self.base_url.clone(),
            access_token: self.access_token.clone(),
            timeout: self.timeout_seconds.map(Duration::from_secs),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api/".to_string()
}

fn default_settlements_path() -> String {
    "liquidaciones/".to_string()
}

fn default_providers_path() -> String {
    "manicuristas/".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct ExportSettings {
    #[serde(default = "default_brand_name")]
    pub brand_name: String,
    #[serde(default = "default_document_title")]
    pub document_title: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default)]
    pub renderer: RendererChoice,
    #[serde(default)]
    pub page: PageFormat,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            brand_name: default_brand_name(),
            document_title: default_document_title(),
            output_dir: default_output_dir(),
            file_prefix: default_file_prefix(),
            renderer: RendererChoice::default(),
            page: PageFormat::default(),
        }
    }
}

fn default_brand_name() -> String {
    "WINE NAILS SPA".to_string()
}

fn default_document_title() -> String {
    "Settlement of Services".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_file_prefix() -> String {
    "Settlement".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct NotificationSettings {
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            dedup_window_ms: default_dedup_window_ms(),
        }
    }
}

impl NotificationSettings {
    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }
}

fn default_dedup_window_ms() -> u64 {
    2000
}

#[derive(Deserialize, Clone, Debug)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// OTLP collector; spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let configuration_directory = configuration_directory("settlement-frontend")?;
    load_settings(&configuration_directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn shipped_base_yaml_parses() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
        let settings: Settings = load_settings(&dir).expect("base.yaml loads");
        assert_eq!(settings.api.settlements_path, "liquidaciones/");
        assert_eq!(settings.export.file_prefix, "Settlement");
        assert_eq!(settings.export.renderer, RendererChoice::Auto);
        assert_eq!(settings.notifications.dedup_window(), Duration::from_millis(2000));
        assert_eq!(settings.api.rest_client_config().timeout, None);
    }

    #[test]
    fn defaults_without_any_file() {
        let settings = Settings::default();
        assert_eq!(settings.api.base_url, "http://127.0.0.1:8000/api/");
        assert_eq!(settings.export.brand_name, "WINE NAILS SPA");
        assert!(settings.api.access_token.is_none());
        assert!(!settings.session.is_provider());
    }
}
