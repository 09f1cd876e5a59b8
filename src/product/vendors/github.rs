//! GitHub family: the latest release of a repository, through the releases API

use std::path::Path;

use chrono::DateTime;
use regex::Regex;
use serde::Deserialize;

use crate::config::{ConfigError, ProductEntry};
use crate::product::error::ProductError;
use crate::product::types::{InstallerProfile, Target, UpdateCandidate};
use crate::product::vendor::{Vendor, read_artifact};
use crate::version::semver::normalize_version;

pub const FAMILY: &str = "github";

/// Default base URL for GitHub API
const DEFAULT_API_URL: &str = "https://api.github.com";

/// Response from the GitHub latest release endpoint
#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    published_at: Option<String>,
    html_url: Option<String>,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
    size: Option<u64>,
    /// `sha256:<hex>`, absent on older releases
    digest: Option<String>,
}

pub struct GitHubVendor {
    repository: String,
    name: String,
    api_url: String,
    asset: Option<Regex>,
    target: Option<Target>,
    std_args: String,
    silent_args: String,
}

impl GitHubVendor {
    pub fn from_entry(entry: &ProductEntry) -> Result<Self, ConfigError> {
        let repository = entry
            .option("repository")
            .ok_or_else(|| ConfigError::MissingKey {
                section: entry.id.clone(),
                key: "repository".to_string(),
            })?;
        if repository.split('/').filter(|p| !p.is_empty()).count() != 2 {
            return Err(ConfigError::invalid_value(
                &entry.id,
                "repository",
                repository,
                "expected 'owner/name'",
            ));
        }

        let asset = entry
            .option("asset")
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::invalid_value(&entry.id, "asset", pattern, &e.to_string())
                })
            })
            .transpose()?;

        let target = entry
            .option("target")
            .map(|value| {
                value.parse::<Target>().map_err(|_| {
                    ConfigError::invalid_value(&entry.id, "target", value, "expected x86, x64 or unified")
                })
            })
            .transpose()?;

        let name = entry
            .option("name")
            .map(String::from)
            .unwrap_or_else(|| repository.rsplit('/').next().unwrap_or(repository).to_string());

        Ok(Self {
            repository: repository.trim_matches('/').to_string(),
            name,
            api_url: entry
                .option("api_url")
                .unwrap_or(DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            asset,
            target,
            std_args: entry.option("std_args").unwrap_or_default().to_string(),
            silent_args: entry.option("silent_args").unwrap_or_default().to_string(),
        })
    }

    fn select_asset<'a>(&self, assets: &'a [Asset]) -> Option<&'a Asset> {
        match &self.asset {
            Some(pattern) => assets.iter().find(|a| pattern.is_match(&a.name)),
            None => assets.first(),
        }
    }
}

/// Date part of an RFC 3339 timestamp
fn publication_date(published_at: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(published_at)
        .ok()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

impl Vendor for GitHubVendor {
    fn family(&self) -> &'static str {
        FAMILY
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn metadata_location(&self) -> String {
        format!("{}/repos/{}/releases/latest", self.api_url, self.repository)
    }

    fn parse_metadata(&self, artifact: &Path) -> Result<UpdateCandidate, ProductError> {
        let content = read_artifact(artifact)?;
        let release: Release = serde_json::from_str(&content)
            .map_err(|e| ProductError::MetadataMalformed(format!("invalid release JSON: {}", e)))?;

        let asset = self.select_asset(&release.assets).ok_or_else(|| {
            ProductError::MetadataMalformed(format!(
                "release {} of {} has no matching asset",
                release.tag_name, self.repository
            ))
        })?;

        Ok(UpdateCandidate {
            version: normalize_version(&release.tag_name).to_string(),
            published: release.published_at.as_deref().and_then(publication_date),
            location: Some(asset.browser_download_url.clone()),
            release_note: release.html_url,
            file_size: asset.size,
            secure_hash: asset.digest.clone(),
        })
    }

    fn installer_profile(&self, _candidate: &UpdateCandidate) -> InstallerProfile {
        InstallerProfile {
            target: self.target,
            std_inst_args: Some(self.std_args.clone()),
            silent_inst_args: Some(self.silent_args.clone()),
            release_note: None,
        }
    }
}
