//! Vendor trait: the per-family metadata parser and installer details

use std::path::Path;

#[cfg(test)]
use mockall::automock;

use crate::product::error::ProductError;
use crate::product::types::{InstallerProfile, UpdateCandidate};

/// Family-specific knowledge about a product
#[cfg_attr(test, automock)]
pub trait Vendor: Send + Sync {
    /// Returns the family name this implementation handles
    fn family(&self) -> &'static str;

    /// Name given to a product seen for the first time
    fn display_name(&self) -> String;

    /// Location of the vendor's metadata document
    fn metadata_location(&self) -> String;

    /// Extracts the latest published release from a retrieved metadata document
    ///
    /// # Returns
    /// * `Ok(UpdateCandidate)` - The release described by the document
    /// * `Err(ProductError::MetadataMalformed)` - If the expected fields are missing
    fn parse_metadata(&self, artifact: &Path) -> Result<UpdateCandidate, ProductError>;

    /// Descriptive fields of a downloaded installer
    fn installer_profile(&self, candidate: &UpdateCandidate) -> InstallerProfile;
}

/// Read a retrieved metadata document as text
pub fn read_artifact(artifact: &Path) -> Result<String, ProductError> {
    std::fs::read_to_string(artifact).map_err(|e| {
        ProductError::MetadataMalformed(format!("unreadable metadata document: {}", e))
    })
}
