//! Catalog store backed by an INI file, one section per product id

use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use ini::{EscapePolicy, Ini, ParseOption, Properties, WriteOption};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::product::types::{ProductRecord, Target, UpdateCandidate};

/// Version of the on-disk layout, written in the header
pub const CATALOG_SCHEME: &str = "0.3.0";

/// Records keyed by product id, in catalog order
pub type Catalog = IndexMap<String, ProductRecord>;

const NAME: &str = "name";
const TARGET: &str = "target";
const VERSION: &str = "version";
const PUBLISHED: &str = "published";
const RELEASE_NOTE: &str = "release_note";
const INSTALLER: &str = "installer";
const STD_INST_ARGS: &str = "std_inst_args";
const SILENT_INST_ARGS: &str = "silent_inst_args";
const FILE_SIZE: &str = "file_size";
const SECURE_HASH: &str = "secure_hash";
const UPDATE_AVAILABLE: &str = "update_available";
const UPDATE_VERSION: &str = "update_version";
const UPDATE_PUBLISHED: &str = "update_published";
const UPDATE_LOCATION: &str = "update_location";
const UPDATE_RELEASE_NOTE: &str = "update_release_note";
const UPDATE_FILE_SIZE: &str = "update_file_size";
const UPDATE_SECURE_HASH: &str = "update_secure_hash";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Invalid catalog entry [{product}] {key} = '{value}'")]
    InvalidValue {
        product: String,
        key: &'static str,
        value: String,
    },

    #[error("Failed to write catalog {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Owner of the catalog file for the duration of a run
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every record of the catalog.
    ///
    /// A missing catalog is not an error: it yields an empty catalog.
    pub fn load(&self) -> Result<Catalog, CatalogError> {
        if !self.path.exists() {
            warn!(
                "Catalog {:?} does not exist, starting with an empty catalog",
                self.path
            );
            return Ok(Catalog::new());
        }

        let ini = Ini::load_from_file_opt(&self.path, catalog_parse_option()).map_err(|source| {
            CatalogError::Read {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut catalog = Catalog::new();
        for (section, properties) in ini.iter() {
            let Some(id) = section else {
                continue;
            };
            catalog.insert(id.to_string(), parse_record(id, properties)?);
        }

        debug!("Loaded {} records from {:?}", catalog.len(), self.path);
        Ok(catalog)
    }

    /// Rewrites the whole catalog.
    ///
    /// The content goes to a temporary file in the same directory which then
    /// replaces the catalog, so a crash leaves either the old or the new file.
    pub fn save(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        let write_failed = |source: std::io::Error| CatalogError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&directory).map_err(write_failed)?;

        let content = render(catalog, Local::now());
        let mut file = NamedTempFile::new_in(&directory).map_err(write_failed)?;
        file.write_all(content.as_bytes()).map_err(write_failed)?;
        file.as_file().sync_all().map_err(write_failed)?;
        file.persist(&self.path).map_err(|e| write_failed(e.error))?;

        info!("Catalog saved to {:?} ({} records)", self.path, catalog.len());
        Ok(())
    }
}

/// Quotes and escapes are decoded by `decode_value`, not by rust-ini
fn catalog_parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

/// Renders the catalog file content, header included
pub fn render(catalog: &Catalog, modified: DateTime<Local>) -> String {
    let mut ini = Ini::new();
    for (id, record) in catalog {
        let mut section = ini.with_section(Some(id.as_str()));
        section.set(NAME, encode_value(&record.name));

        let optional = [
            (TARGET, record.target.map(|t| t.as_str().to_string())),
            (VERSION, record.version.clone()),
            (PUBLISHED, record.published.clone()),
            (RELEASE_NOTE, record.release_note.clone()),
            (INSTALLER, record.installer.clone()),
            (STD_INST_ARGS, record.std_inst_args.clone()),
            (SILENT_INST_ARGS, record.silent_inst_args.clone()),
            (FILE_SIZE, record.file_size.map(|size| size.to_string())),
            (SECURE_HASH, record.secure_hash.clone()),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                section.set(key, encode_value(&value));
            }
        }

        match &record.update {
            Some(update) => {
                section.set(UPDATE_AVAILABLE, "yes");
                section.set(UPDATE_VERSION, encode_value(&update.version));
                let pending = [
                    (UPDATE_PUBLISHED, update.published.clone()),
                    (UPDATE_LOCATION, update.location.clone()),
                    (UPDATE_RELEASE_NOTE, update.release_note.clone()),
                    (UPDATE_FILE_SIZE, update.file_size.map(|size| size.to_string())),
                    (UPDATE_SECURE_HASH, update.secure_hash.clone()),
                ];
                for (key, value) in pending {
                    if let Some(value) = value {
                        section.set(key, encode_value(&value));
                    }
                }
            }
            None => {
                section.set(UPDATE_AVAILABLE, "no");
            }
        }
    }

    let mut body = Vec::new();
    let option = WriteOption {
        escape_policy: EscapePolicy::Nothing,
        ..WriteOption::default()
    };
    // Writing to a Vec cannot fail
    let _ = ini.write_to_opt(&mut body, option);

    format!(
        "; This file is generated by appdownload, do not modify it.\n\
         ; catalog scheme: {}\n\
         ; modified: {}\n\n{}",
        CATALOG_SCHEME,
        modified.format("%Y-%m-%d %H:%M:%S"),
        String::from_utf8_lossy(&body)
    )
}

/// Writes a value so that it reads back unchanged.
///
/// rust-ini trims values, so a value with surrounding whitespace, a leading
/// double quote or a control character is written as a double-quoted string
/// with `\\`, `\"`, `\n`, `\r`, `\t` and `\uXXXX` escapes. Any other
/// value, Windows paths included, is written as is.
fn encode_value(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.trim() != value
        || value.starts_with('"')
        || value.chars().any(char::is_control);
    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Reverses `encode_value`. Unknown escapes are kept as written.
fn decode_value(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => value.push('\\'),
            Some('"') => value.push('"'),
            Some('n') => value.push('\n'),
            Some('r') => value.push('\r'),
            Some('t') => value.push('\t'),
            Some('u') => {
                let code: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&code, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if code.len() == 4 => value.push(decoded),
                    _ => {
                        value.push_str("\\u");
                        value.push_str(&code);
                    }
                }
            }
            Some(other) => {
                value.push('\\');
                value.push(other);
            }
            None => value.push('\\'),
        }
    }
    value
}

fn parse_record(id: &str, properties: &Properties) -> Result<ProductRecord, CatalogError> {
    // Argument strings may legitimately be empty
    let value = |key: &str| properties.get(key).map(decode_value);
    let field = |key: &str| value(key).filter(|v| !v.is_empty());
    let invalid = |key: &'static str, value: &str| CatalogError::InvalidValue {
        product: id.to_string(),
        key,
        value: value.to_string(),
    };
    let size = |key: &'static str| match field(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid(key, &value)),
        None => Ok(None),
    };

    let target = match field(TARGET) {
        Some(value) => Some(
            value
                .parse::<Target>()
                .map_err(|_| invalid(TARGET, &value))?,
        ),
        None => None,
    };

    let update_available = match field(UPDATE_AVAILABLE).as_deref() {
        None | Some("no") => false,
        Some("yes") => true,
        Some(other) => return Err(invalid(UPDATE_AVAILABLE, other)),
    };
    let update = if update_available {
        let version = field(UPDATE_VERSION).ok_or_else(|| invalid(UPDATE_VERSION, ""))?;
        Some(UpdateCandidate {
            version,
            published: field(UPDATE_PUBLISHED),
            location: field(UPDATE_LOCATION),
            release_note: field(UPDATE_RELEASE_NOTE),
            file_size: size(UPDATE_FILE_SIZE)?,
            secure_hash: field(UPDATE_SECURE_HASH),
        })
    } else {
        None
    };

    Ok(ProductRecord {
        id: id.to_string(),
        name: field(NAME).unwrap_or_default(),
        target,
        version: field(VERSION),
        published: field(PUBLISHED),
        installer: field(INSTALLER),
        std_inst_args: value(STD_INST_ARGS),
        silent_inst_args: value(SILENT_INST_ARGS),
        release_note: field(RELEASE_NOTE),
        file_size: size(FILE_SIZE)?,
        secure_hash: field(SECURE_HASH),
        update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use tempfile::TempDir;

    fn fetched_record() -> ProductRecord {
        ProductRecord {
            target: Some(Target::Unified),
            version: Some("1.17.6".to_string()),
            published: Some("2024-02-05".to_string()),
            installer: Some("/srv/store/makemkv/makemkv-1.17.6.exe".to_string()),
            std_inst_args: Some(String::new()),
            silent_inst_args: Some("/S".to_string()),
            release_note: Some("http://www.makemkv.com/download/".to_string()),
            file_size: Some(17_302_528),
            ..ProductRecord::new("makemkv", "MakeMKV")
        }
    }

    fn pending_record() -> ProductRecord {
        ProductRecord {
            version: Some("1.0.0".to_string()),
            update: Some(UpdateCandidate {
                version: "1.2.0".to_string(),
                published: Some("2024-03-01".to_string()),
                location: Some("http://example.com/sample.exe".to_string()),
                secure_hash: Some("sha256:9f86d081884c7d65".to_string()),
                ..UpdateCandidate::default()
            }),
            ..ProductRecord::new("sample", "Sample")
        }
    }

    #[test]
    fn render_writes_header_and_sections() {
        let mut catalog = Catalog::new();
        catalog.insert("sample".to_string(), pending_record());
        let modified = Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let content = render(&catalog, modified);

        assert!(content.starts_with("; This file is generated by appdownload, do not modify it.\n"));
        assert!(content.contains("; catalog scheme: 0.3.0\n"));
        assert!(content.contains("; modified: 2024-03-01 12:30:00\n"));
        assert!(content.contains("[sample]"));
        assert!(content.contains("update_available=yes"));
        assert!(content.contains("update_version=1.2.0"));
        assert!(content.contains("update_location=http://example.com/sample.exe"));
        assert!(!content.contains("update_release_note"));
        assert!(!content.contains("target"));
    }

    #[test]
    fn save_then_load_preserves_records_and_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::new(temp_dir.path().join("store").join("catalog.ini"));
        let mut catalog = Catalog::new();
        catalog.insert("sample".to_string(), pending_record());
        catalog.insert("makemkv".to_string(), fetched_record());

        store.save(&catalog).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, catalog);
        assert_eq!(
            loaded.keys().collect::<Vec<_>>(),
            vec!["sample", "makemkv"]
        );
    }

    #[test]
    fn load_missing_catalog_returns_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::new(temp_dir.path().join("catalog.ini"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn load_tolerates_manual_edits() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.ini");
        std::fs::write(
            &path,
            "# edited by hand\n[sample]\nname = Sample\nversion = 1.0.0\n\n; extra key\nupdate_available = no\ncomment = kept aside\n",
        )
        .unwrap();

        let loaded = CatalogStore::new(&path).load().unwrap();

        assert_eq!(
            loaded.get("sample"),
            Some(&ProductRecord {
                version: Some("1.0.0".to_string()),
                ..ProductRecord::new("sample", "Sample")
            })
        );
    }

    #[test]
    fn load_reports_syntax_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.ini");
        std::fs::write(&path, "[sample\nname = Sample\n").unwrap();

        let result = CatalogStore::new(&path).load();

        assert!(matches!(result, Err(CatalogError::Read { .. })));
    }

    #[rstest]
    #[case("[sample]\nupdate_available = maybe\n", "update_available")]
    #[case("[sample]\nupdate_available = yes\n", "update_version")]
    #[case("[sample]\ntarget = arm64\n", "target")]
    #[case("[sample]\nfile_size = big\n", "file_size")]
    #[case("[sample]\nupdate_available = yes\nupdate_version = 1.0\nupdate_file_size = -1\n", "update_file_size")]
    fn load_reports_invalid_values(#[case] content: &str, #[case] expected: &str) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.ini");
        std::fs::write(&path, content).unwrap();

        let result = CatalogStore::new(&path).load();

        assert!(matches!(result, Err(CatalogError::InvalidValue { key, .. }) if key == expected));
    }

    #[rstest]
    #[case::quoted_switch("\"/quiet\"")]
    #[case::quoted_path("\"C:\\Program Files\\App\\setup.exe\" /S")]
    #[case::surrounding_spaces("  /S  ")]
    #[case::comment_characters("/LOG=a;b #1")]
    #[case::embedded_quotes("/D=\"x y\" /Q")]
    #[case::lone_quote("\"")]
    #[case::escape_lookalike("\"C:\\new\\u0041\"")]
    #[case::line_break("first\nsecond")]
    fn save_then_load_keeps_argument_strings_verbatim(#[case] args: &str) {
        let temp_dir = TempDir::new().unwrap();
        let store = CatalogStore::new(temp_dir.path().join("catalog.ini"));
        let mut catalog = Catalog::new();
        catalog.insert(
            "makemkv".to_string(),
            ProductRecord {
                silent_inst_args: Some(args.to_string()),
                std_inst_args: Some(format!(" {args}")),
                installer: Some(args.to_string()),
                ..fetched_record()
            },
        );

        store.save(&catalog).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, catalog);
    }

    #[test]
    fn render_leaves_plain_values_unquoted() {
        let mut catalog = Catalog::new();
        catalog.insert(
            "app".to_string(),
            ProductRecord {
                installer: Some(r"C:\store\app\app-1.0.exe".to_string()),
                silent_inst_args: Some("/S /D=C:\\Apps".to_string()),
                ..ProductRecord::new("app", "App")
            },
        );
        let modified = Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let content = render(&catalog, modified);

        assert!(content.contains(r"installer=C:\store\app\app-1.0.exe"));
        assert!(content.contains(r"silent_inst_args=/S /D=C:\Apps"));
    }

    #[test]
    fn load_reads_hand_quoted_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("catalog.ini");
        std::fs::write(
            &path,
            "[sample]\nname = Sample\nsilent_inst_args = \" /S \"\ninstaller = C:\\a b\\setup.exe\n",
        )
        .unwrap();

        let loaded = CatalogStore::new(&path).load().unwrap();
        let record = &loaded["sample"];

        assert_eq!(record.silent_inst_args.as_deref(), Some(" /S "));
        assert_eq!(record.installer.as_deref(), Some(r"C:\a b\setup.exe"));
    }

    #[test]
    fn save_reports_unwritable_location() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = CatalogStore::new(blocker.join("catalog.ini"));

        let result = store.save(&Catalog::new());

        assert!(matches!(result, Err(CatalogError::WriteFailed { .. })));
    }
}
