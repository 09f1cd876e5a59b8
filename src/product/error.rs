use thiserror::Error;

use crate::transport::TransportError;

/// Errors of a single product cycle.
///
/// They are recovered by the orchestrator: the product keeps its prior
/// record and other products are not affected.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Metadata unavailable from {location}: {source}")]
    MetadataUnavailable {
        location: String,
        #[source]
        source: TransportError,
    },

    #[error("Malformed metadata: {0}")]
    MetadataMalformed(String),

    #[error("Failed to fetch {location}: {source}")]
    FetchFailed {
        location: String,
        #[source]
        source: TransportError,
    },

    #[error("Invalid recorded version: '{0}'")]
    InvalidVersion(String),
}
