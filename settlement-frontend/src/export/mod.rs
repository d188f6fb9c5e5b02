//! Settlement PDF export.
//!
//! Two renderers lay out the same content: [`rich::TableRenderer`] uses the
//! grid helper in [`table`], [`plain::PlainRenderer`] only places text and
//! rules. Which one runs is decided once, when the exporter is built.

pub mod canvas;
pub mod pdf;
pub mod plain;
pub mod rich;
pub mod table;

use crate::config::ExportSettings;
use crate::models::dates::{format_file_date, format_short_date};
use crate::models::money::format_currency;
use crate::models::{AppointmentLine, Settlement};
use crate::notifications::Notifier;
use crate::services::SettlementBackend;
use canvas::{Layout, PageSize};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const PAGE_MARGIN: f32 = 20.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererChoice {
    /// Pick by capability probe.
    #[default]
    Auto,
    Rich,
    Plain,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
    A5,
}

impl PageFormat {
    pub fn size(self) -> PageSize {
        match self {
            PageFormat::A4 => PageSize {
                width: 210.0,
                height: 297.0,
            },
            PageFormat::Letter => PageSize {
                width: 215.9,
                height: 279.4,
            },
            PageFormat::A5 => PageSize {
                width: 148.0,
                height: 210.0,
            },
        }
    }
}

/// What gets rendered: the settlement and, when available, its appointments.
pub struct SettlementDocument<'a> {
    pub settlement: &'a Settlement,
    pub lines: &'a [AppointmentLine],
}

pub struct RenderContext {
    pub brand_name: String,
    pub document_title: String,
    pub page: PageSize,
    pub generated_on: NaiveDate,
}

pub trait SettlementRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, document: &SettlementDocument<'_>, context: &RenderContext) -> Layout;
}

/// What the current page setup can support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The detail table's columns fit the printable width.
    pub table_layout: bool,
}

impl Capabilities {
    pub fn probe(page: PageSize) -> Self {
        Self {
            table_layout: rich::TableRenderer::fits(page),
        }
    }
}

pub fn select_renderer(choice: RendererChoice, capabilities: Capabilities) -> Box<dyn SettlementRenderer> {
    match choice {
        RendererChoice::Rich => {
            if !capabilities.table_layout {
                tracing::warn!("Rich renderer forced on a page narrower than its table");
            }
            Box::new(rich::TableRenderer)
        }
        RendererChoice::Plain => Box::new(plain::PlainRenderer),
        RendererChoice::Auto if capabilities.table_layout => Box::new(rich::TableRenderer),
        RendererChoice::Auto => Box::new(plain::PlainRenderer),
    }
}

/// `<prefix>_<id>_<provider>_<dd-mm-yyyy>.pdf`
pub fn file_name(prefix: &str, settlement: &Settlement) -> String {
    let provider: String = settlement
        .provider_name()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!(
        "{}_{}_{}_{}.pdf",
        prefix,
        settlement.id,
        provider,
        format_file_date(settlement.fecha_inicio)
    )
}

pub(crate) fn period_label(settlement: &Settlement) -> String {
    format!(
        "{} - {}",
        format_short_date(settlement.fecha_inicio),
        format_short_date(settlement.fecha_final)
    )
}

pub(crate) fn created_label(settlement: &Settlement) -> String {
    settlement
        .creation_date()
        .map(format_short_date)
        .unwrap_or_else(|| "Not available".to_string())
}

pub(crate) const TOTAL_LABEL: &str = "TOTAL TO PAY";

/// Value summary shared by both renderers; the last row is the total.
pub(crate) fn summary_rows(settlement: &Settlement) -> Vec<(&'static str, String)> {
    vec![
        (
            "Completed services",
            settlement.cantidad_servicios_completados.to_string(),
        ),
        (
            "Services total",
            format_currency(settlement.total_servicios_completados),
        ),
        ("Bonus", format_currency(settlement.bonificacion)),
        ("Subtotal (before 50% split)", format_currency(settlement.subtotal())),
        ("Base value (50% commission)", format_currency(settlement.valor)),
        (TOTAL_LABEL, format_currency(settlement.total_a_pagar)),
    ]
}

/// `#, date, time, client, services, price` per appointment.
pub(crate) fn detail_rows(lines: &[AppointmentLine]) -> Vec<Vec<String>> {
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            vec![
                (index + 1).to_string(),
                line.display_date(),
                line.display_time(),
                line.client_name(),
                line.service_names(),
                format_currency(line.price()),
            ]
        })
        .collect()
}

pub(crate) fn running_header(brand_name: &str, settlement: &Settlement) -> String {
    format!("{} - Settlement #{}", brand_name, settlement.id)
}

pub struct SettlementExporter {
    renderer: Box<dyn SettlementRenderer>,
    settings: ExportSettings,
}

impl SettlementExporter {
    pub fn new(settings: ExportSettings) -> Self {
        let capabilities = Capabilities::probe(settings.page.size());
        let renderer = select_renderer(settings.renderer, capabilities);
        tracing::info!(
            renderer = renderer.name(),
            page = ?settings.page,
            table_layout = capabilities.table_layout,
            "Settlement exporter ready"
        );
        Self { renderer, settings }
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }

    pub fn file_name(&self, settlement: &Settlement) -> String {
        file_name(&self.settings.file_prefix, settlement)
    }

    pub fn layout(
        &self,
        settlement: &Settlement,
        lines: &[AppointmentLine],
        generated_on: NaiveDate,
    ) -> Layout {
        let context = RenderContext {
            brand_name: self.settings.brand_name.clone(),
            document_title: self.settings.document_title.clone(),
            page: self.settings.page.size(),
            generated_on,
        };
        self.renderer
            .render(&SettlementDocument { settlement, lines }, &context)
    }

    pub fn render(
        &self,
        settlement: &Settlement,
        lines: &[AppointmentLine],
        generated_on: NaiveDate,
    ) -> Result<Vec<u8>, RenderError> {
        let layout = self.layout(settlement, lines, generated_on);
        let title = format!("{} #{}", self.settings.document_title, settlement.id);
        pdf::write_pdf(&layout, &title)
    }

    /// Render and write the PDF into `dir`. Failures are reported through
    /// `notifier`; the return value says whether a file was written.
    pub async fn write(
        &self,
        settlement: &Settlement,
        lines: &[AppointmentLine],
        dir: &Path,
        generated_on: NaiveDate,
        notifier: &mut Notifier,
    ) -> bool {
        let path = dir.join(self.file_name(settlement));
        match self.write_file(settlement, lines, &path, generated_on).await {
            Ok(()) => {
                tracing::info!(
                    settlement_id = settlement.id,
                    path = %path.display(),
                    renderer = self.renderer.name(),
                    "Settlement PDF written"
                );
                notifier.success("PDF generated successfully");
                true
            }
            Err(err) => {
                tracing::error!(
                    settlement_id = settlement.id,
                    path = %path.display(),
                    error = %err,
                    "Settlement PDF export failed"
                );
                notifier.error("Error generating the PDF");
                false
            }
        }
    }

    async fn write_file(
        &self,
        settlement: &Settlement,
        lines: &[AppointmentLine],
        path: &Path,
        generated_on: NaiveDate,
    ) -> Result<(), RenderError> {
        let bytes = self.render(settlement, lines, generated_on)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    /// Fetch the appointment detail, then write the PDF. Without the detail
    /// the document is still produced, minus the appointment table.
    pub async fn export<B>(
        &self,
        backend: &B,
        settlement: &Settlement,
        dir: &Path,
        generated_on: NaiveDate,
        notifier: &mut Notifier,
    ) -> bool
    where
        B: SettlementBackend + ?Sized,
    {
        notifier.info("Generating PDF...");

        let lines = match backend.get_appointment_detail(settlement.id).await {
            Ok(detail) => detail.citas_detalle,
            Err(err) => {
                tracing::warn!(
                    settlement_id = settlement.id,
                    status = ?err.status,
                    error = %err.detail,
                    "Appointment detail unavailable; exporting without it"
                );
                Vec::new()
            }
        };

        self.write(settlement, &lines, dir, generated_on, notifier).await
    }
}
