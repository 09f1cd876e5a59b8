//! No-op reference family
//!
//! Its metadata document is a plain `key = value` text file, which makes it
//! convenient to exercise the whole cycle against a local mirror.

use std::path::Path;

use ini::Ini;

use crate::config::{ConfigError, ProductEntry, ini_parse_option};
use crate::product::error::ProductError;
use crate::product::types::{InstallerProfile, Target, UpdateCandidate};
use crate::product::vendor::{Vendor, read_artifact};

pub const FAMILY: &str = "dummy";

const DEFAULT_NAME: &str = "Dummy Product";
const DEFAULT_CATALOG_URL: &str = "http://www.example.com/index.html";
const SILENT_ARGS: &str = "/silent";

pub struct DummyVendor {
    name: String,
    catalog_url: String,
}

impl DummyVendor {
    pub fn new(name: &str, catalog_url: &str) -> Self {
        Self {
            name: name.to_string(),
            catalog_url: catalog_url.to_string(),
        }
    }

    pub fn from_entry(entry: &ProductEntry) -> Result<Self, ConfigError> {
        Ok(Self::new(
            entry.option("name").unwrap_or(DEFAULT_NAME),
            entry.option("catalog_url").unwrap_or(DEFAULT_CATALOG_URL),
        ))
    }
}

impl Default for DummyVendor {
    fn default() -> Self {
        Self::new(DEFAULT_NAME, DEFAULT_CATALOG_URL)
    }
}

impl Vendor for DummyVendor {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn metadata_location(&self) -> String {
        self.catalog_url.clone()
    }

    fn parse_metadata(&self, artifact: &Path) -> Result<UpdateCandidate, ProductError> {
        let content = read_artifact(artifact)?;
        let document = Ini::load_from_str_opt(&content, ini_parse_option())
            .map_err(|e| ProductError::MetadataMalformed(e.to_string()))?;
        let fields = document.general_section();
        let field = |key: &str| {
            fields
                .get(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let version = field("version")
            .ok_or_else(|| ProductError::MetadataMalformed("missing 'version'".to_string()))?;
        let file_size = match field("file_size") {
            Some(size) => Some(size.parse::<u64>().map_err(|_| {
                ProductError::MetadataMalformed(format!("invalid 'file_size' {}", size))
            })?),
            None => None,
        };

        Ok(UpdateCandidate {
            version,
            published: field("published"),
            location: field("location"),
            release_note: field("release_note"),
            file_size,
            secure_hash: field("secure_hash"),
        })
    }

    fn installer_profile(&self, _candidate: &UpdateCandidate) -> InstallerProfile {
        InstallerProfile {
            target: Some(Target::Unified),
            std_inst_args: Some(String::new()),
            silent_inst_args: Some(SILENT_ARGS.to_string()),
            release_note: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn artifact(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_metadata_reads_all_fields() {
        let file = artifact(
            "version = 1.2.0\npublished = 2024-03-01\nlocation = http://example.com/sample.exe\nrelease_note = http://example.com/notes\nfile_size = 2048\nsecure_hash = sha256:9f86d081884c7d65\n",
        );

        let candidate = DummyVendor::default().parse_metadata(file.path()).unwrap();

        assert_eq!(
            candidate,
            UpdateCandidate {
                version: "1.2.0".to_string(),
                published: Some("2024-03-01".to_string()),
                location: Some("http://example.com/sample.exe".to_string()),
                release_note: Some("http://example.com/notes".to_string()),
                file_size: Some(2048),
                secure_hash: Some("sha256:9f86d081884c7d65".to_string()),
            }
        );
    }

    #[test]
    fn parse_metadata_treats_absent_optional_fields_as_none() {
        let file = artifact("version = 1.0.1\n");

        let candidate = DummyVendor::default().parse_metadata(file.path()).unwrap();

        assert_eq!(candidate.version, "1.0.1");
        assert_eq!(candidate.published, None);
        assert_eq!(candidate.location, None);
        assert_eq!(candidate.file_size, None);
        assert_eq!(candidate.secure_hash, None);
    }

    #[test]
    fn parse_metadata_rejects_invalid_file_size() {
        let file = artifact("version = 1.0.1\nfile_size = 2 MB\n");

        let result = DummyVendor::default().parse_metadata(file.path());

        assert!(matches!(result, Err(ProductError::MetadataMalformed(_))));
    }

    #[test]
    fn parse_metadata_requires_version() {
        let file = artifact("published = 2024-03-01\n");

        let result = DummyVendor::default().parse_metadata(file.path());

        assert!(matches!(result, Err(ProductError::MetadataMalformed(_))));
    }

    #[test]
    fn from_entry_reads_options() {
        let config = crate::config::Config::parse(
            "[core]\nstore = /srv/store\n[sets]\n[applications]\nsample = true\n[sample]\nfamily = dummy\nname = Sample\ncatalog_url = http://mirror/sample.txt\n",
        )
        .unwrap();

        let vendor = DummyVendor::from_entry(&config.products[0]).unwrap();

        assert_eq!(vendor.display_name(), "Sample");
        assert_eq!(vendor.metadata_location(), "http://mirror/sample.txt");
        assert_eq!(
            vendor.installer_profile(&UpdateCandidate::default()).silent_inst_args.as_deref(),
            Some("/silent")
        );
    }
}
