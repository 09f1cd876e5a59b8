//! Fatal errors of a run

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::export::ExportError;

/// Errors that abort a run. Per-product errors never reach this level.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl Error {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Config(_) => 2,
            Error::Catalog(_) => 3,
            Error::Export(_) => 4,
        }
    }
}
