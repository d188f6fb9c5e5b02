pub mod client;
pub mod envelope;
pub mod error;

pub use client::{RestClient, RestClientConfig};
pub use envelope::{EnvelopeError, ListEnvelope};
pub use error::{RemoteError, RemoteErrorKind};
