//! Working mirror of the settlement list and the edits made from it.

use crate::error::SettlementError;
use crate::models::{Settlement, SettlementFilters, SettlementUpdate};
use crate::notifications::Notifier;
use crate::services::SettlementClient;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct SettlementBoard {
    filters: SettlementFilters,
    settlements: Vec<Settlement>,
}

impl SettlementBoard {
    pub fn new(filters: SettlementFilters) -> Self {
        Self {
            filters,
            settlements: Vec::new(),
        }
    }

    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    pub fn find(&self, id: i64) -> Option<&Settlement> {
        self.settlements.iter().find(|s| s.id == id)
    }

    /// Settlements keyed by provider id, each group in list order.
    pub fn by_provider(&self) -> BTreeMap<i64, Vec<&Settlement>> {
        let mut groups: BTreeMap<i64, Vec<&Settlement>> = BTreeMap::new();
        for settlement in &self.settlements {
            groups
                .entry(settlement.provider_id())
                .or_default()
                .push(settlement);
        }
        groups
    }

    /// Reload the list. On failure the previous mirror is kept.
    pub async fn refresh(
        &mut self,
        client: &SettlementClient,
        notifier: &mut Notifier,
    ) -> Result<&[Settlement], SettlementError> {
        match client.list_settlements(&self.filters).await {
            Ok(settlements) => {
                tracing::debug!(count = settlements.len(), "Settlement list refreshed");
                self.settlements = settlements;
                Ok(&self.settlements)
            }
            Err(err) => {
                notifier.error(format!("Error loading settlements: {}", err.user_message));
                Err(err.into())
            }
        }
    }

    /// Refresh after a change; a failed reload does not undo the change.
    async fn refresh_after_change(&mut self, client: &SettlementClient, notifier: &mut Notifier) {
        if let Err(err) = self.refresh(client, notifier).await {
            tracing::warn!(error = %err, "Refresh after change failed");
        }
    }

    fn ensure_can_manage(client: &SettlementClient, notifier: &mut Notifier) -> Result<(), SettlementError> {
        if client.session().can_manage() {
            return Ok(());
        }
        notifier.warning("Your role cannot modify settlements");
        Err(crate::error::ValidationError::new("rol", "Read-only session").into())
    }

    /// Apply a value/bonus/notes edit, then refresh.
    pub async fn edit(
        &mut self,
        client: &SettlementClient,
        id: i64,
        update: SettlementUpdate,
        notifier: &mut Notifier,
    ) -> Result<Settlement, SettlementError> {
        Self::ensure_can_manage(client, notifier)?;

        let updated = match client.update_settlement(id, &update).await {
            Ok(updated) => updated,
            Err(err) => {
                notifier.error(format!("Error updating settlement: {}", err.user_message));
                return Err(err.into());
            }
        };

        tracing::info!(settlement_id = id, "Settlement updated");
        notifier.success("Settlement updated successfully");
        self.refresh_after_change(client, notifier).await;
        Ok(updated)
    }

    pub async fn mark_paid(
        &mut self,
        client: &SettlementClient,
        id: i64,
        notifier: &mut Notifier,
    ) -> Result<(), SettlementError> {
        Self::ensure_can_manage(client, notifier)?;

        if let Err(err) = client.mark_as_paid(id).await {
            notifier.error(format!("Error marking settlement as paid: {}", err.user_message));
            return Err(err.into());
        }

        tracing::info!(settlement_id = id, "Settlement marked as paid");
        notifier.success("Settlement marked as paid");
        self.refresh_after_change(client, notifier).await;
        Ok(())
    }

    /// Called after a creation elsewhere (calculator or batch).
    pub async fn created(&mut self, client: &SettlementClient, notifier: &mut Notifier) {
        self.refresh_after_change(client, notifier).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Provider, ProviderRef};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn settlement(id: i64, provider: ProviderRef) -> Settlement {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        Settlement {
            id,
            manicurista: provider,
            fecha_inicio: day,
            fecha_final: day,
            valor: Decimal::from(10000),
            bonificacion: Decimal::ZERO,
            total_a_pagar: Decimal::from(10000),
            cantidad_servicios_completados: 1,
            total_servicios_completados: Decimal::from(20000),
            observaciones: None,
            fecha_creacion: None,
            estado: None,
        }
    }

    #[test]
    fn find_and_group_by_provider() {
        let board = SettlementBoard {
            filters: SettlementFilters::default(),
            settlements: vec![
                settlement(1, ProviderRef::Id(5)),
                settlement(2, ProviderRef::Embedded(Provider::summary(3, "Ana Pérez"))),
                settlement(3, ProviderRef::Id(5)),
            ],
        };

        assert_eq!(board.find(2).map(Settlement::provider_name), Some("Ana Pérez".to_string()));
        assert!(board.find(9).is_none());

        let groups = board.by_provider();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![3, 5]);
        let ids: Vec<i64> = groups[&5].iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
