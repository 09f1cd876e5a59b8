//! Product trait and its vendor-backed implementation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Url;
use tracing::{debug, info, warn};

use crate::product::error::ProductError;
use crate::product::types::{ProductRecord, UpdateCandidate};
use crate::product::vendor::Vendor;
use crate::transport::{Transport, TransportError};
use crate::version::semver::{CompareResult, compare_versions, is_valid_version};

/// Result of a fetch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// No pending update was recorded
    NothingToFetch,
    /// The pending update was downloaded and applied
    Fetched { version: String, installer: PathBuf },
}

/// Check/fetch contract of a tracked product
#[async_trait::async_trait]
pub trait Product: Send {
    /// Stable product id
    fn id(&self) -> &str;

    /// Initializes the in-memory state from a prior record, or defaults for a new product
    fn load(&mut self, record: Option<ProductRecord>);

    /// Checks whether the vendor published a newer version
    ///
    /// # Returns
    /// * `Ok(Some(UpdateCandidate))` - A strictly newer version, now pending
    /// * `Ok(None)` - Nothing newer; any pending update is cleared
    /// * `Err(ProductError)` - Metadata could not be retrieved or parsed
    async fn check_update(&mut self) -> Result<Option<UpdateCandidate>, ProductError>;

    /// Downloads the pending update into `destination` and applies it
    async fn fetch_update(&mut self, destination: &Path) -> Result<FetchOutcome, ProductError>;

    /// Serializes the in-memory state
    fn dump(&self) -> ProductRecord;
}

/// Product whose family behaviour is provided by a [`Vendor`]
pub struct VendorProduct {
    record: ProductRecord,
    vendor: Arc<dyn Vendor>,
    transport: Arc<dyn Transport>,
}

impl VendorProduct {
    pub fn new(id: &str, vendor: Arc<dyn Vendor>, transport: Arc<dyn Transport>) -> Self {
        let record = ProductRecord::new(id, &vendor.display_name());
        Self {
            record,
            vendor,
            transport,
        }
    }

    fn is_newer(&self, candidate: &UpdateCandidate) -> Result<bool, ProductError> {
        if !is_valid_version(&candidate.version) {
            return Err(ProductError::MetadataMalformed(format!(
                "unorderable version '{}'",
                candidate.version
            )));
        }

        let Some(current) = self.record.current_version() else {
            return Ok(true);
        };

        match compare_versions(current, &candidate.version) {
            CompareResult::Outdated => Ok(true),
            CompareResult::Latest | CompareResult::Newer => Ok(false),
            CompareResult::Invalid => Err(ProductError::InvalidVersion(current.to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Product for VendorProduct {
    fn id(&self) -> &str {
        &self.record.id
    }

    fn load(&mut self, record: Option<ProductRecord>) {
        let Some(mut record) = record else {
            debug!("'{}' has no prior record, keeping defaults", self.record.id);
            return;
        };

        if record.id != self.record.id {
            warn!(
                "Record id '{}' does not match product '{}', keeping the product id",
                record.id, self.record.id
            );
            record.id = self.record.id.clone();
        }
        if record.name.trim().is_empty() {
            record.name = self.record.name.clone();
        }
        self.record = record;
    }

    async fn check_update(&mut self) -> Result<Option<UpdateCandidate>, ProductError> {
        info!(
            "Checking '{}' ({}) for updates. Current version is {:?}",
            self.record.id,
            self.vendor.family(),
            self.record.current_version()
        );

        let location = self.vendor.metadata_location();
        let unavailable = |source: TransportError| ProductError::MetadataUnavailable {
            location: location.clone(),
            source,
        };

        // Removed when dropped, whatever the outcome
        let artifact = tempfile::Builder::new()
            .prefix("appdownload-metadata-")
            .tempfile()
            .map_err(|e| unavailable(TransportError::Io {
                path: std::env::temp_dir(),
                source: e,
            }))?;

        self.transport
            .retrieve(&location, artifact.path())
            .await
            .map_err(unavailable)?;
        debug!("Metadata of '{}' retrieved from {}", self.record.id, location);

        let candidate = self.vendor.parse_metadata(artifact.path())?;

        if self.is_newer(&candidate)? {
            info!(
                "A new version of '{}' exists ({}) published on {}",
                self.record.id,
                candidate.version,
                candidate.published.as_deref().unwrap_or("unknown date")
            );
            self.record.update = Some(candidate.clone());
            Ok(Some(candidate))
        } else {
            info!("No new version of '{}' available", self.record.id);
            self.record.update = None;
            Ok(None)
        }
    }

    async fn fetch_update(&mut self, destination: &Path) -> Result<FetchOutcome, ProductError> {
        let Some(candidate) = self.record.update.clone() else {
            info!("Nothing to fetch for '{}'", self.record.id);
            return Ok(FetchOutcome::NothingToFetch);
        };

        // The version ends up in the installer file name
        if !is_valid_version(&candidate.version) {
            return Err(ProductError::MetadataMalformed(format!(
                "pending update of '{}' has an unorderable version '{}'",
                self.record.id, candidate.version
            )));
        }

        let location = candidate.location.clone().ok_or_else(|| {
            ProductError::MetadataMalformed(format!(
                "pending update {} of '{}' has no download location",
                candidate.version, self.record.id
            ))
        })?;
        let failed = |source: TransportError| ProductError::FetchFailed {
            location: location.clone(),
            source,
        };

        info!(
            "Downloading '{}' {} from {}",
            self.record.id, candidate.version, location
        );

        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|e| failed(TransportError::Io {
                path: destination.to_path_buf(),
                source: e,
            }))?;

        // Partial downloads never reach the canonical name
        let download = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(destination)
            .map_err(|e| failed(TransportError::Io {
                path: destination.to_path_buf(),
                source: e,
            }))?;

        self.transport
            .retrieve(&location, download.path())
            .await
            .map_err(failed)?;

        let installer = destination.join(installer_file_name(
            &self.record.name,
            &candidate.version,
            &location,
        ));
        download.persist(&installer).map_err(|e| {
            failed(TransportError::Io {
                path: installer.clone(),
                source: e.error,
            })
        })?;

        let profile = self.vendor.installer_profile(&candidate);
        let version = candidate.version.clone();
        self.record
            .apply_update(candidate, installer.display().to_string(), profile);

        info!(
            "New version of '{}' fetched, saved as {:?}",
            self.record.id, installer
        );

        Ok(FetchOutcome::Fetched { version, installer })
    }

    fn dump(&self) -> ProductRecord {
        self.record.clone()
    }
}

/// Canonical installer name: `<slug(name)>-<version><ext>`
///
/// The extension is taken from the last path segment of the download location.
pub fn installer_file_name(name: &str, version: &str, location: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "installer".to_string() } else { slug };

    let segment = match Url::parse(location) {
        // One-letter schemes are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(String::from)
            .unwrap_or_default(),
        _ => location
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(location)
            .to_string(),
    };
    let extension = Path::new(&segment)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    format!("{}-{}{}", slug, version, extension)
}
