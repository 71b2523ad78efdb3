//! TOML/JSON-based compilation settings.
//!
//! Example configuration:
//! ```toml
//! disable_join = false
//! search_fields = ["name", "Owner.name"]
//! search_operator = "$starts"
//! default_sort = ["name,ASC", "id,DESC"]
//! default_page_size = 25
//!
//! [blacklist]
//! fields = ["password"]
//! relations = ["Sessions"]
//!
//! [blacklist.nested.Owner]
//! fields = ["email"]
//! is_final = true
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::blacklist::Blacklist;
use crate::dsl::Sort;
use crate::operator::OperatorRegistry;

/// Page size used when neither the request nor the settings give one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Environment variable naming a settings file for [`Settings::load`].
pub const CONFIG_ENV_VAR: &str = "SIEVE_CONFIG";

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON settings: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Compilation settings for one request type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Ignore `filter` and `or` terms.
    pub disable_filter: bool,

    /// Ignore `sort` terms (the default sort still applies).
    pub disable_sort: bool,

    /// Ignore `join` terms. Relation paths in filters and sorts still join.
    pub disable_join: bool,

    /// Ignore the `fields` selection.
    pub disable_fields: bool,

    /// Ignore the `search` query.
    pub disable_search: bool,

    /// Access-control tree applied to every term.
    pub blacklist: Blacklist,

    /// Fields searched; every admissible root column when unset.
    pub search_fields: Option<Vec<String>>,

    /// Operator used for search; `$cont` when unset.
    pub search_operator: Option<String>,

    /// Applied only when the request has no sort.
    pub default_sort: Vec<Sort>,

    /// Page size when the request does not give one.
    pub default_page_size: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disable_filter: false,
            disable_sort: false,
            disable_join: false,
            disable_fields: false,
            disable_search: false,
            blacklist: Blacklist::default(),
            search_fields: None,
            search_operator: None,
            default_sort: Vec::new(),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> SettingsResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Parse settings from JSON text.
    pub fn from_json_str(content: &str) -> SettingsResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SIEVE_CONFIG`
    /// 2. `./sieve.toml`
    ///
    /// Falls back to defaults when neither exists.
    pub fn load() -> SettingsResult<Self> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("sieve.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        Ok(Settings::default())
    }

    /// Check references that can only be resolved against an operator
    /// registry.
    pub fn validate(&self, operators: &OperatorRegistry) -> SettingsResult<()> {
        if let Some(op) = &self.search_operator {
            if !operators.contains(op) {
                return Err(SettingsError::InvalidConfig(format!(
                    "unknown search operator '{}'",
                    op
                )));
            }
        }
        if self.default_page_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "default_page_size must be positive".into(),
            ));
        }
        Ok(())
    }

    // Builder methods

    #[must_use]
    pub fn with_blacklist(mut self, blacklist: Blacklist) -> Self {
        self.blacklist = blacklist;
        self
    }

    #[must_use]
    pub fn with_search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    #[must_use]
    pub fn with_search_operator(mut self, operator: &str) -> Self {
        self.search_operator = Some(operator.into());
        self
    }

    #[must_use]
    pub fn with_default_sort(mut self, sort: Vec<Sort>) -> Self {
        self.default_sort = sort;
        self
    }

    #[must_use]
    pub fn with_default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size;
        self
    }
}
