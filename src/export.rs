//! Export of the catalog to per-component applist files

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::{APPLIST_EXT, APPLIST_PREFIX, APPLIST_SEP, Config};
use crate::product::types::ProductRecord;

const HEADER_RULE: &str =
    "# ------------------------------------------------------------------------------";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot export '{product}': field '{field}' is missing")]
    FieldMissing {
        product: String,
        field: &'static str,
    },

    #[error("Failed to write applist file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A product left out of the applist files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedProduct {
    pub product: String,
    pub reason: String,
}

/// What an export pass produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Files written, in creation order
    pub files: Vec<PathBuf>,
    /// Lines written across all files
    pub lines: usize,
    pub skipped: Vec<SkippedProduct>,
}

/// Path of the applist file of a component
pub fn applist_path(out_dir: &Path, component: &str) -> PathBuf {
    out_dir.join(format!("{}{}{}", APPLIST_PREFIX, component, APPLIST_EXT))
}

/// Builds the applist line of a record
///
/// # Returns
/// * `Ok(String)` - `target;name;version;installer;silent_args`
/// * `Err(ExportError::FieldMissing)` - If the record was never fetched
pub fn applist_line(record: &ProductRecord) -> Result<String, ExportError> {
    let missing = |field: &'static str| ExportError::FieldMissing {
        product: record.id.clone(),
        field,
    };

    let target = record.target.ok_or_else(|| missing("target"))?;
    if record.name.trim().is_empty() {
        return Err(missing("name"));
    }
    let version = record.current_version().ok_or_else(|| missing("version"))?;
    let installer = record
        .installer
        .as_deref()
        .filter(|i| !i.trim().is_empty())
        .ok_or_else(|| missing("installer"))?;
    let silent_args = record.silent_inst_args.as_deref().unwrap_or_default();

    Ok([
        target.as_str(),
        record.name.as_str(),
        version,
        installer,
        silent_args,
    ]
    .join(APPLIST_SEP))
}

fn header(component: &str, generated: DateTime<Local>) -> String {
    format!(
        "{rule}\n\
         # This applist file generated on {date} for '{component}'.\n\
         # This file is automatically generated, and must not be manually modified.\n\
         # Please modify the configuration file instead (appdownload.ini by default).\n\
         {rule}\n",
        rule = HEADER_RULE,
        date = generated.format("%Y-%m-%dT%H:%M:%S"),
        component = component,
    )
}

/// Writes the applist files of every enabled product into `out_dir`.
///
/// Files are keyed by component and opened on their first line, so products
/// sharing a component interleave in configuration order. A product whose
/// record lacks a field is skipped; an I/O error aborts the pass.
pub fn export(
    config: &Config,
    catalog: &Catalog,
    out_dir: &Path,
    generated: DateTime<Local>,
) -> Result<ExportReport, ExportError> {
    info!("Writing the applist files from the catalog");

    let mut report = ExportReport::default();
    // Dropping the writers closes every file, on error paths too
    let mut files: IndexMap<String, (PathBuf, BufWriter<File>)> = IndexMap::new();

    for entry in config.enabled_products() {
        let line = match catalog
            .get(&entry.id)
            .ok_or_else(|| ExportError::FieldMissing {
                product: entry.id.clone(),
                field: "record",
            })
            .and_then(applist_line)
        {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping '{}' in applist files: {}", entry.id, e);
                report.skipped.push(SkippedProduct {
                    product: entry.id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let Some(components) = config.components(&entry.set) else {
            warn!("Skipping '{}': set '{}' has no components", entry.id, entry.set);
            report.skipped.push(SkippedProduct {
                product: entry.id.clone(),
                reason: format!("set '{}' is not declared", entry.set),
            });
            continue;
        };

        for component in components {
            if !files.contains_key(&component) {
                let path = applist_path(out_dir, &component);
                let mut writer = create_applist(&path)?;
                writer
                    .write_all(header(&component, generated).as_bytes())
                    .map_err(|source| ExportError::Io {
                        path: path.clone(),
                        source,
                    })?;
                info!("'{}' applist file created -> {:?}", component, path);
                report.files.push(path.clone());
                files.insert(component.clone(), (path, writer));
            }

            if let Some((path, writer)) = files.get_mut(&component) {
                writeln!(writer, "{}", line).map_err(|source| ExportError::Io {
                    path: path.clone(),
                    source,
                })?;
                debug!("'{}' added to applist of '{}'", entry.id, component);
                report.lines += 1;
            }
        }
    }

    for (_, (path, mut writer)) in files {
        writer
            .flush()
            .map_err(|source| ExportError::Io { path, source })?;
    }

    Ok(report)
}

fn create_applist(path: &Path) -> Result<BufWriter<File>, ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    File::create(path).map(BufWriter::new).map_err(io_error)
}
