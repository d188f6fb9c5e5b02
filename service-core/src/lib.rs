//! service-core: Shared infrastructure for the settlement workspace.
pub mod config;
pub mod error;
pub mod fanout;
pub mod http;
pub mod observability;

pub use reqwest;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
