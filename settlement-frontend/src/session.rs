//! Who is using the front end, and what that lets them see.

use crate::models::{Provider, SettlementFilters};
use serde::Deserialize;

pub const PROVIDER_ROLE: &str = "manicurista";

/// Passed explicitly into the service layer; nothing reads it from globals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SessionContext {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub provider_id: Option<i64>,
}

impl SessionContext {
    pub fn admin() -> Self {
        Self {
            role: Some("admin".to_string()),
            provider_id: None,
        }
    }

    pub fn provider(provider_id: i64) -> Self {
        Self {
            role: Some(PROVIDER_ROLE.to_string()),
            provider_id: Some(provider_id),
        }
    }

    pub fn is_provider(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| role.eq_ignore_ascii_case(PROVIDER_ROLE))
    }

    /// The only provider this session may see, if it is restricted to one.
    pub fn scoped_provider(&self) -> Option<i64> {
        if self.is_provider() {
            self.provider_id
        } else {
            None
        }
    }

    /// Force the provider filter for provider sessions.
    pub fn scope_filters(&self, mut filters: SettlementFilters) -> SettlementFilters {
        if let Some(id) = self.scoped_provider() {
            filters.provider_id = Some(id);
        }
        filters
    }

    pub fn scope_providers(&self, providers: Vec<Provider>) -> Vec<Provider> {
        match self.scoped_provider() {
            Some(id) => providers.into_iter().filter(|p| p.id == id).collect(),
            None => providers,
        }
    }

    /// Provider sessions cannot create, edit, pay or delete settlements.
    pub fn can_manage(&self) -> bool {
        !self.is_provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_session_forces_own_filter() {
        let session = SessionContext::provider(7);
        let filters = session.scope_filters(SettlementFilters {
            provider_id: Some(3),
            ..Default::default()
        });
        assert_eq!(filters.provider_id, Some(7));
        assert!(!session.can_manage());
    }

    #[test]
    fn admin_session_keeps_filters() {
        let session = SessionContext::admin();
        let filters = session.scope_filters(SettlementFilters {
            provider_id: Some(3),
            ..Default::default()
        });
        assert_eq!(filters.provider_id, Some(3));
        assert!(session.can_manage());
    }

    #[test]
    fn provider_role_without_id_is_not_scoped() {
        let session = SessionContext {
            role: Some("Manicurista".to_string()),
            provider_id: None,
        };
        assert!(session.is_provider());
        assert_eq!(session.scoped_provider(), None);
    }

    #[test]
    fn provider_list_is_narrowed() {
        let providers = vec![Provider::summary(1, "Ana"), Provider::summary(7, "Lucía")];
        let visible = SessionContext::provider(7).scope_providers(providers);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, 7);
    }
}
