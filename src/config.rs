use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use ini::{Ini, ParseOption, Properties};
use thiserror::Error;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default timeout for network retrievals in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Delay between starting each product cycle to avoid hammering vendors (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

// =============================================================================
// File names and formats
// =============================================================================

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "appdownload.ini";

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV_VAR: &str = "APPDOWNLOAD_CONFIG";

/// Catalog file name inside the store directory
pub const CATALOG_FILE_NAME: &str = "catalog.ini";

/// Log file name inside the configured log directory
pub const LOG_FILE_NAME: &str = "appdownload.log";

pub const APPLIST_PREFIX: &str = "applist-";
pub const APPLIST_EXT: &str = ".txt";
pub const APPLIST_SEP: &str = ";";

/// Set used by products that do not declare one
pub const DEFAULT_SET: &str = "__all__";

/// Component of the implicit default set
pub const DEFAULT_COMPONENT: &str = "all";

// Sections and keys of the configuration file
const CORE_SECTION: &str = "core";
const SETS_SECTION: &str = "sets";
const APPS_SECTION: &str = "applications";
const STORE_KEY: &str = "store";
const TIMEOUT_KEY: &str = "timeout";
const LOG_DIR_KEY: &str = "log_dir";
const FAMILY_KEY: &str = "family";
const PATH_KEY: &str = "path";
const SET_KEY: &str = "set";

/// Configuration errors.
///
/// All of them are fatal: they are raised before any product is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("Configuration error: the section '{0}' is missing")]
    MissingSection(String),

    #[error("Configuration error: the key '{key}' is missing in section '{section}'")]
    MissingKey { section: String, key: String },

    #[error("Configuration error: set '{set}' is not declared in section 'sets' (see '{product}')")]
    UndeclaredSet { product: String, set: String },

    #[error("Configuration error: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: unknown product family '{family}' (see '{product}')")]
    UnknownFamily { product: String, family: String },
}

impl ConfigError {
    pub fn invalid_value(section: &str, key: &str, value: &str, reason: &str) -> Self {
        Self::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Validated configuration of a run
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub core: CoreSettings,
    /// Set name -> ordered component list
    pub sets: IndexMap<String, Vec<String>>,
    /// Product entries in configuration order
    pub products: Vec<ProductEntry>,
}

/// `[core]` section
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSettings {
    /// Directory holding the catalog and the applist files
    pub store: PathBuf,
    /// Timeout applied to every network retrieval
    pub timeout: Duration,
    pub log_dir: Option<PathBuf>,
}

/// One product of the `[applications]` section, completed with its own section
#[derive(Debug, Clone, PartialEq)]
pub struct ProductEntry {
    pub id: String,
    pub enabled: bool,
    /// Plugin family selector
    pub family: String,
    /// Directory where installers are downloaded
    pub path: PathBuf,
    pub set: String,
    /// Family-specific keys of the product section
    pub options: IndexMap<String, String>,
}

impl ProductEntry {
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl Config {
    /// Load and validate the configuration from a file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file_opt(path, ini_parse_option()).map_err(|source| {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::from_ini(&ini)
    }

    /// Parse and validate a configuration held in memory.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str_opt(content, ini_parse_option())?;
        Self::from_ini(&ini)
    }

    /// Validate an `Ini` document. Validation is all-or-nothing.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let core = parse_core(section(ini, CORE_SECTION)?)?;
        let sets = parse_sets(section(ini, SETS_SECTION)?);
        let apps = section(ini, APPS_SECTION)?;

        let mut products = Vec::new();
        for (id, flag) in apps.iter() {
            let enabled = parse_bool(flag)
                .ok_or_else(|| ConfigError::invalid_value(APPS_SECTION, id, flag, "expected a boolean"))?;
            let product = parse_product(ini, id, enabled, &core.store, &sets)?;
            products.push(product);
        }

        Ok(Self {
            core,
            sets,
            products,
        })
    }

    /// Path of the catalog file
    pub fn catalog_path(&self) -> PathBuf {
        self.core.store.join(CATALOG_FILE_NAME)
    }

    /// Resolve the component list of a set.
    ///
    /// The implicit default set resolves to the single `all` component
    /// unless it is declared explicitly.
    pub fn components(&self, set: &str) -> Option<Vec<String>> {
        match self.sets.get(set) {
            Some(components) => Some(components.clone()),
            None if set == DEFAULT_SET => Some(vec![DEFAULT_COMPONENT.to_string()]),
            None => None,
        }
    }

    pub fn enabled_products(&self) -> impl Iterator<Item = &ProductEntry> {
        self.products.iter().filter(|p| p.enabled)
    }
}

fn section<'a>(ini: &'a Ini, name: &str) -> Result<&'a Properties, ConfigError> {
    ini.section(Some(name))
        .ok_or_else(|| ConfigError::MissingSection(name.to_string()))
}

fn parse_core(section: &Properties) -> Result<CoreSettings, ConfigError> {
    let store = section
        .get(STORE_KEY)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingKey {
            section: CORE_SECTION.to_string(),
            key: STORE_KEY.to_string(),
        })?;

    let timeout = match section.get(TIMEOUT_KEY) {
        Some(v) => {
            let secs: u64 = v.trim().parse().map_err(|_| {
                ConfigError::invalid_value(CORE_SECTION, TIMEOUT_KEY, v, "expected a number of seconds")
            })?;
            if secs == 0 {
                return Err(ConfigError::invalid_value(
                    CORE_SECTION,
                    TIMEOUT_KEY,
                    v,
                    "must be greater than zero",
                ));
            }
            Duration::from_secs(secs)
        }
        None => Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
    };

    let log_dir = section
        .get(LOG_DIR_KEY)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(expand_tilde);

    Ok(CoreSettings {
        store: expand_tilde(store),
        timeout,
        log_dir,
    })
}

fn parse_sets(section: &Properties) -> IndexMap<String, Vec<String>> {
    section
        .iter()
        .map(|(name, components)| {
            let components = components
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            (name.to_string(), components)
        })
        .collect()
}

fn parse_product(
    ini: &Ini,
    id: &str,
    enabled: bool,
    store: &Path,
    sets: &IndexMap<String, Vec<String>>,
) -> Result<ProductEntry, ConfigError> {
    let mut entry = ProductEntry {
        id: id.to_string(),
        enabled,
        family: id.to_string(),
        path: store.join(id),
        set: DEFAULT_SET.to_string(),
        options: IndexMap::new(),
    };

    let Some(section) = ini.section(Some(id)) else {
        return Ok(entry);
    };

    for (key, value) in section.iter() {
        let value = value.trim();
        match key {
            FAMILY_KEY if !value.is_empty() => entry.family = value.to_string(),
            PATH_KEY if !value.is_empty() => entry.path = expand_tilde(value),
            SET_KEY if !value.is_empty() => {
                if value != DEFAULT_SET && !sets.contains_key(value) {
                    return Err(ConfigError::UndeclaredSet {
                        product: id.to_string(),
                        set: value.to_string(),
                    });
                }
                entry.set = value.to_string();
            }
            FAMILY_KEY | PATH_KEY | SET_KEY => {}
            _ => {
                entry.options.insert(key.to_string(), value.to_string());
            }
        }
    }

    Ok(entry)
}

/// INI reading options for hand-written files (configuration, dummy metadata).
///
/// Backslashes are kept verbatim so that Windows paths and regexes survive.
/// The catalog uses its own options, see `catalog::store`.
pub fn ini_parse_option() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        ..ParseOption::default()
    }
}

/// Parse the boolean spellings accepted in the `[applications]` section.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Returns the configuration file to use when none is given on the command line.
///
/// Uses $APPDOWNLOAD_CONFIG if set, then ./appdownload.ini if it exists,
/// then the user configuration directory.
pub fn config_path() -> PathBuf {
    config_path_with_env(
        std::env::var(CONFIG_ENV_VAR).ok(),
        PathBuf::from(DEFAULT_CONFIG_FILE),
        dirs::config_dir(),
    )
}

fn config_path_with_env(
    env_path: Option<String>,
    local_path: PathBuf,
    config_dir: Option<PathBuf>,
) -> PathBuf {
    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    if local_path.exists() {
        return local_path;
    }
    config_dir
        .map(|dir| dir.join("appdownload").join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.exists())
        .unwrap_or(local_path)
}
