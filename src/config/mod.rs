//! Configuration module.
//!
//! Per-request-type compilation settings: which request features are
//! enabled, the access-control blacklist, search and sort defaults.

mod settings;

pub use settings::{Settings, SettingsError, SettingsResult, CONFIG_ENV_VAR, DEFAULT_PAGE_SIZE};
