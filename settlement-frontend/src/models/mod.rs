pub mod aggregation;
pub mod dates;
pub mod money;
pub mod provider;
pub mod settlement;

pub use aggregation::{AggregationResult, AppointmentLine, AppointmentSummary, SettlementAppointments};
pub use provider::Provider;
pub use settlement::{
    NewSettlement, ProviderRef, Settlement, SettlementFilters, SettlementStatus, SettlementUpdate,
};
