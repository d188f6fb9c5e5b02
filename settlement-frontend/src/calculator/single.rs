//! Calculate-then-create flow for one provider.

use crate::calculator::Liveness;
use crate::error::{SettlementError, ValidationError};
use crate::models::dates::week_bounds;
use crate::models::money::{round2, rounded_sum};
use crate::models::{AggregationResult, NewSettlement, Provider, Settlement};
use crate::notifications::Notifier;
use crate::services::SettlementBackend;
use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum CalculationState {
    Idle,
    Calculating,
    Calculated(AggregationResult),
    /// The last calculation failed; holds the user-facing message.
    Failed(String),
}

/// Editable inputs of the single-provider form.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementForm {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Base value, set by calculation.
    pub value: Decimal,
    /// `None` is a blank input, counted as zero.
    pub bonus: Option<Decimal>,
    pub notes: String,
}

impl SettlementForm {
    /// Empty form over the Monday to Sunday week containing `today`.
    pub fn for_week_of(today: NaiveDate) -> Self {
        let (start, end) = week_bounds(today);
        Self {
            start: Some(start),
            end: Some(end),
            value: Decimal::ZERO,
            bonus: None,
            notes: String::new(),
        }
    }

    pub fn bonus_or_zero(&self) -> Decimal {
        self.bonus.unwrap_or_default()
    }

    /// `round2(value) + round2(bonus)`, rounded.
    pub fn total(&self) -> Decimal {
        rounded_sum(self.value, self.bonus_or_zero())
    }
}

pub struct SettlementCalculator {
    provider: Provider,
    today: NaiveDate,
    form: SettlementForm,
    state: CalculationState,
    liveness: Liveness,
}

impl SettlementCalculator {
    pub fn new(provider: Provider, today: NaiveDate, liveness: Liveness) -> Self {
        Self {
            provider,
            today,
            form: SettlementForm::for_week_of(today),
            state: CalculationState::Idle,
            liveness,
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn form(&self) -> &SettlementForm {
        &self.form
    }

    pub fn state(&self) -> &CalculationState {
        &self.state
    }

    pub fn aggregation(&self) -> Option<&AggregationResult> {
        match &self.state {
            CalculationState::Calculated(result) => Some(result),
            _ => None,
        }
    }

    pub fn total(&self) -> Decimal {
        self.form.total()
    }

    /// Changing the period invalidates any earlier calculation.
    pub fn set_period(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        if self.form.start != start || self.form.end != end {
            self.form.start = start;
            self.form.end = end;
            self.form.value = Decimal::ZERO;
            self.state = CalculationState::Idle;
        }
    }

    pub fn set_bonus(&mut self, bonus: Option<Decimal>) {
        self.form.bonus = bonus.map(round2);
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.form.notes = notes.into();
    }

    /// Ask the backend for the provider's completed appointments in the period.
    pub async fn calculate<B>(
        &mut self,
        backend: &B,
        notifier: &mut Notifier,
    ) -> Result<AggregationResult, SettlementError>
    where
        B: SettlementBackend + ?Sized,
    {
        let (start, end) = match (self.form.start, self.form.end) {
            (Some(start), Some(end)) if start <= end => (start, end),
            (Some(_), Some(_)) => {
                notifier.warning("The end date must be on or after the start date");
                return Err(ValidationError::new(
                    "fecha_final",
                    "End date must be on or after the start date",
                )
                .into());
            }
            _ => {
                notifier.warning("Select the provider and both dates to calculate");
                return Err(ValidationError::new("periodo", "Both dates are required").into());
            }
        };

        self.state = CalculationState::Calculating;
        tracing::info!(provider_id = self.provider.id, %start, %end, "Calculating completed appointments");

        let outcome = backend
            .compute_completed_appointments(self.provider.id, start, end)
            .await;

        if !self.liveness.is_alive() {
            tracing::debug!(provider_id = self.provider.id, "Calculator closed; result dropped");
            return Err(SettlementError::Discarded);
        }

        match outcome {
            Ok(result) => {
                let count = result.appointment_count();
                if result.has_services() {
                    self.form.value = result.suggested_value();
                    notifier.success(format!("{} services calculated successfully", count));
                } else {
                    self.form.value = Decimal::ZERO;
                    notifier.warning("No completed services found in the selected period");
                }
                self.state = CalculationState::Calculated(result.clone());
                Ok(result)
            }
            Err(err) => {
                notifier.warning(format!(
                    "Error calculating completed appointments: {}",
                    err.user_message
                ));
                self.state = CalculationState::Failed(err.user_message.clone());
                Err(err.into())
            }
        }
    }

    /// Every reason the form cannot be submitted yet.
    pub fn validate(&self) -> Result<NewSettlement, ValidationError> {
        let mut errors = ValidationError::default();

        if self.form.start.is_none() {
            errors.add("fecha_inicio", "Start date is required");
        }
        if self.form.end.is_none() {
            errors.add("fecha_final", "End date is required");
        }
        if let (Some(start), Some(end)) = (self.form.start, self.form.end) {
            if start > end {
                errors.add("fecha_final", "End date must be on or after the start date");
            }
        }
        if self.form.value < Decimal::ZERO {
            errors.add("valor", "Value cannot be negative");
        }
        if self.form.bonus_or_zero() < Decimal::ZERO {
            errors.add("bonificacion", "Bonus cannot be negative");
        }
        if !self.aggregation().is_some_and(AggregationResult::has_services) {
            errors.add(
                "citas",
                "Calculate completed appointments with at least one service first",
            );
        }

        errors.into_result()?;

        match (self.form.start, self.form.end) {
            (Some(start), Some(end)) => NewSettlement::new(
                self.provider.id,
                start,
                end,
                self.form.value,
                self.form.bonus_or_zero(),
                self.form.notes.clone(),
            ),
            _ => Err(ValidationError::new("periodo", "Both dates are required")),
        }
    }

    /// Create the settlement from the current calculation. Nothing is sent
    /// unless the form validates.
    pub async fn create<B>(
        &mut self,
        backend: &B,
        notifier: &mut Notifier,
    ) -> Result<Settlement, SettlementError>
    where
        B: SettlementBackend + ?Sized,
    {
        let payload = match self.validate() {
            Ok(payload) => payload,
            Err(errors) => {
                notifier.error("Please fix the errors in the form");
                return Err(errors.into());
            }
        };

        let outcome = backend.create_automatic_settlement(&payload).await;

        if !self.liveness.is_alive() {
            return outcome.map_err(SettlementError::from);
        }

        match outcome {
            Ok(settlement) => {
                tracing::info!(
                    settlement_id = settlement.id,
                    provider_id = self.provider.id,
                    total = %payload.total(),
                    "Settlement created"
                );
                notifier.success("Settlement created successfully");
                self.reset();
                Ok(settlement)
            }
            Err(err) => {
                notifier.error(format!("Error: {}", err.user_message));
                Err(err.into())
            }
        }
    }

    /// Back to an empty form over the current week.
    pub fn reset(&mut self) {
        self.form = SettlementForm::for_week_of(self.today);
        self.state = CalculationState::Idle;
    }
}
