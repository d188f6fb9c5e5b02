//! Global settlements: one shared period, many providers.
//!
//! Calculation fans out one aggregation call per selected provider and waits
//! for all of them; a failed provider becomes a flagged zero row. Creation
//! fans out one create call per provider with services and fails as a whole
//! when any call fails. Calls that already succeeded stay created remotely.

use crate::calculator::Liveness;
use crate::error::{SettlementError, ValidationError};
use crate::models::dates::{format_short_date, week_bounds};
use crate::models::money::{format_currency, round2, rounded_sum};
use crate::models::{AggregationResult, AppointmentLine, NewSettlement, Provider, Settlement};
use crate::notifications::Notifier;
use crate::services::SettlementBackend;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::fanout::{join_all_or_fail, join_all_settled};

/// Providers picked for the batch, unique by id, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSelection {
    providers: Vec<Provider>,
}

impl BatchSelection {
    pub fn from_providers(providers: impl IntoIterator<Item = Provider>) -> Self {
        let mut selection = Self::default();
        for provider in providers {
            if !selection.is_selected(provider.id) {
                selection.providers.push(provider);
            }
        }
        selection
    }

    pub fn is_selected(&self, provider_id: i64) -> bool {
        self.providers.iter().any(|p| p.id == provider_id)
    }

    /// Add or remove one provider. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, provider: Provider) -> bool {
        if self.is_selected(provider.id) {
            self.providers.retain(|p| p.id != provider.id);
            false
        } else {
            self.providers.push(provider);
            true
        }
    }

    /// Select every provider on `page`, or deselect them all when they
    /// already are.
    pub fn toggle_all(&mut self, page: &[Provider]) {
        if page.iter().all(|p| self.is_selected(p.id)) {
            self.providers
                .retain(|selected| !page.iter().any(|p| p.id == selected.id));
        } else {
            for provider in page {
                if !self.is_selected(provider.id) {
                    self.providers.push(provider.clone());
                }
            }
        }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn clear(&mut self) {
        self.providers.clear();
    }
}

/// One provider's row in the batch working set.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub provider: Provider,
    pub value: Decimal,
    pub bonus: Decimal,
    pub total: Decimal,
    pub aggregation: Option<AggregationResult>,
    /// User-facing message when this provider's calculation failed.
    pub error: Option<String>,
}

impl BatchEntry {
    fn calculated(provider: Provider, result: AggregationResult) -> Self {
        let value = result.suggested_value();
        Self {
            provider,
            value,
            bonus: Decimal::ZERO,
            total: value,
            aggregation: Some(result),
            error: None,
        }
    }

    fn failed(provider: Provider, message: String) -> Self {
        Self {
            provider,
            value: Decimal::ZERO,
            bonus: Decimal::ZERO,
            total: Decimal::ZERO,
            aggregation: None,
            error: Some(message),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn appointment_count(&self) -> u32 {
        self.aggregation
            .as_ref()
            .map(AggregationResult::appointment_count)
            .unwrap_or(0)
    }

    /// Only rows with a positive value and at least one appointment are created.
    pub fn is_creatable(&self) -> bool {
        self.value > Decimal::ZERO && self.appointment_count() > 0
    }
}

/// An appointment from any provider in the batch, tagged with its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedLine {
    pub provider_id: i64,
    pub provider_name: String,
    pub line: AppointmentLine,
}

impl CombinedLine {
    fn matches(&self, term: &str) -> bool {
        let price = self.line.price();
        [
            self.line.client_name(),
            self.provider_name.clone(),
            self.line.display_date(),
            self.line.fecha.clone().unwrap_or_default(),
            self.line.display_time(),
            self.line.service_names(),
            format_currency(price),
            price.to_string(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(term))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchView {
    /// Choosing providers and the period.
    Selecting,
    /// Reviewing calculated rows before creation.
    Reviewing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchCreation {
    pub created: Vec<Settlement>,
    /// Rows left out for having no services.
    pub excluded: usize,
}

pub struct BatchCalculator {
    selection: BatchSelection,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    entries: Vec<BatchEntry>,
    combined: Vec<CombinedLine>,
    liveness: Liveness,
}

impl BatchCalculator {
    /// Empty batch over the Monday to Sunday week containing `today`.
    pub fn new(today: NaiveDate, liveness: Liveness) -> Self {
        let (start, end) = week_bounds(today);
        Self {
            selection: BatchSelection::default(),
            start: Some(start),
            end: Some(end),
            entries: Vec::new(),
            combined: Vec::new(),
            liveness,
        }
    }

    pub fn selection(&self) -> &BatchSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut BatchSelection {
        &mut self.selection
    }

    pub fn period(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.start, self.end)
    }

    /// A new period drops rows calculated for the old one.
    pub fn set_period(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        if self.start != start || self.end != end {
            self.start = start;
            self.end = end;
            self.entries.clear();
            self.combined.clear();
        }
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn combined_lines(&self) -> &[CombinedLine] {
        &self.combined
    }

    pub fn view(&self) -> BatchView {
        if self.entries.is_empty() {
            BatchView::Selecting
        } else {
            BatchView::Reviewing
        }
    }

    /// Sum of totals over the rows that would be created.
    pub fn batch_total(&self) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.is_creatable())
            .map(|e| e.total)
            .sum()
    }

    pub fn excluded_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_creatable()).count()
    }

    fn checked_period(&self, notifier: &mut Notifier) -> Result<(NaiveDate, NaiveDate), ValidationError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Ok((start, end)),
            (Some(_), Some(_)) => {
                notifier.warning("The end date must be on or after the start date");
                Err(ValidationError::new(
                    "fecha_final",
                    "End date must be on or after the start date",
                ))
            }
            _ => {
                notifier.warning("Select both dates to calculate");
                Err(ValidationError::new("periodo", "Both dates are required"))
            }
        }
    }

    /// Aggregate every selected provider concurrently. Individual failures
    /// are recorded on their rows; the batch still succeeds.
    pub async fn calculate_all<B>(
        &mut self,
        backend: &B,
        notifier: &mut Notifier,
    ) -> Result<&[BatchEntry], SettlementError>
    where
        B: SettlementBackend + ?Sized,
    {
        let (start, end) = self.checked_period(notifier)?;
        if self.selection.is_empty() {
            notifier.warning("Select at least one provider");
            return Err(ValidationError::new("manicuristas", "No provider selected").into());
        }

        let providers = self.selection.providers().to_vec();
        tracing::info!(providers = providers.len(), %start, %end, "Calculating global settlements");

        let outcomes = join_all_settled(
            providers
                .iter()
                .map(|p| backend.compute_completed_appointments(p.id, start, end)),
        )
        .await;

        if !self.liveness.is_alive() {
            tracing::debug!("Batch view closed; results dropped");
            return Err(SettlementError::Discarded);
        }

        self.entries = providers
            .into_iter()
            .zip(outcomes)
            .map(|(provider, outcome)| match outcome {
                Ok(result) => BatchEntry::calculated(provider, result),
                Err(err) => {
                    tracing::warn!(
                        provider_id = provider.id,
                        status = ?err.status,
                        error = %err.detail,
                        "Provider calculation failed"
                    );
                    BatchEntry::failed(provider, err.user_message)
                }
            })
            .collect();

        self.combined = self
            .entries
            .iter()
            .filter_map(|entry| {
                entry.aggregation.as_ref().map(|result| {
                    let provider_name = entry.provider.display_name_or_placeholder();
                    result.citas_detalle.iter().map(move |line| CombinedLine {
                        provider_id: entry.provider.id,
                        provider_name: provider_name.clone(),
                        line: line.clone(),
                    })
                })
            })
            .flatten()
            .collect();

        let failed = self.entries.iter().filter(|e| e.has_error()).count();
        notifier.success(format!(
            "Global settlements calculated - {} services found",
            self.combined.len()
        ));
        if failed > 0 {
            notifier.warning(format!("{} providers could not be calculated", failed));
        }

        Ok(&self.entries)
    }

    /// Set one provider's bonus and recompute only that provider's total.
    pub fn update_bonus(&mut self, provider_id: i64, bonus: Decimal) -> Result<(), ValidationError> {
        if bonus < Decimal::ZERO {
            return Err(ValidationError::new("bonificacion", "Bonus cannot be negative"));
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.provider.id == provider_id)
            .ok_or_else(|| ValidationError::new("manicurista", "Provider is not part of this batch"))?;

        entry.bonus = round2(bonus);
        entry.total = rounded_sum(entry.value, entry.bonus);
        Ok(())
    }

    /// Case-insensitive search over the combined appointment list.
    pub fn search(&self, term: &str) -> Vec<&CombinedLine> {
        let term = term.trim().to_lowercase();
        self.combined
            .iter()
            .filter(|line| term.is_empty() || line.matches(&term))
            .collect()
    }

    /// Create a settlement for every row with services.
    pub async fn create_all<B>(
        &mut self,
        backend: &B,
        notifier: &mut Notifier,
    ) -> Result<BatchCreation, SettlementError>
    where
        B: SettlementBackend + ?Sized,
    {
        if self.entries.is_empty() {
            notifier.warning("Calculate the settlements before creating them");
            return Err(ValidationError::new("citas", "Nothing calculated yet").into());
        }
        let (start, end) = self.checked_period(notifier)?;

        let note = format!(
            "Global settlement - week of {} to {}",
            format_short_date(start),
            format_short_date(end)
        );
        let payloads = self
            .entries
            .iter()
            .filter(|e| e.is_creatable())
            .map(|e| NewSettlement::new(e.provider.id, start, end, e.value, e.bonus, note.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let excluded = self.entries.len() - payloads.len();

        if payloads.is_empty() {
            notifier.warning("No settlements with completed services to create");
            return Err(ValidationError::new("citas", "No provider has completed services").into());
        }
        if excluded > 0 {
            notifier.info(format!(
                "{} settlements without services were skipped",
                excluded
            ));
        }

        tracing::info!(count = payloads.len(), excluded, "Creating global settlements");
        let outcome = join_all_or_fail(
            payloads
                .iter()
                .map(|payload| backend.create_automatic_settlement(payload)),
        )
        .await;

        if !self.liveness.is_alive() {
            return outcome
                .map(|created| BatchCreation { created, excluded })
                .map_err(SettlementError::from);
        }

        match outcome {
            Ok(created) => {
                notifier.success(format!(
                    "{} settlements with services created successfully",
                    created.len()
                ));
                self.reset();
                Ok(BatchCreation { created, excluded })
            }
            Err(err) => {
                notifier.error(format!("Error creating global settlements: {}", err.user_message));
                Err(err.into())
            }
        }
    }

    /// Drop the working set and the selection; back to choosing providers.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.combined.clear();
        self.selection.clear();
    }
}
