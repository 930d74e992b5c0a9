//! Store configuration with environment overrides.
//!
//! # Responsibility
//! - Provide defaults for the documents root and ingest limits.
//! - Read `MINDMAP_*` environment overrides without panicking.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Environment variable overriding `StoreConfig::documents_dir`.
pub const ENV_DOCUMENTS_DIR: &str = "MINDMAP_DOCUMENTS_DIR";
/// Environment variable overriding `StoreConfig::max_document_pages`.
pub const ENV_MAX_DOCUMENT_PAGES: &str = "MINDMAP_MAX_DOCUMENT_PAGES";
/// Environment variable overriding `StoreConfig::debug`.
pub const ENV_DEBUG: &str = "MINDMAP_DEBUG";

const DEFAULT_DOCUMENTS_DIR: &str = "documents";
const DEFAULT_MAX_DOCUMENT_PAGES: u32 = 500;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed.
    InvalidValue { key: &'static str, value: String },
    /// Variable is set to an empty string.
    Empty(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for {key}")
            }
            Self::Empty(key) => write!(f, "{key} must not be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Runtime settings for the document store and ingest service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root holding one folder per content hash.
    pub documents_dir: PathBuf,
    /// Upper bound on pages accepted by ingest.
    pub max_document_pages: u32,
    /// Enables debug-only surfaces such as audit log reads.
    pub debug: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from(DEFAULT_DOCUMENTS_DIR),
            max_document_pages: DEFAULT_MAX_DOCUMENT_PAGES,
            debug: false,
        }
    }
}

impl StoreConfig {
    /// Builds config from defaults plus process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from defaults plus overrides returned by `lookup`.
    ///
    /// Split from `from_env` so tests need not mutate process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DOCUMENTS_DIR) {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Empty(ENV_DOCUMENTS_DIR));
            }
            config.documents_dir = PathBuf::from(trimmed);
        }

        if let Some(value) = lookup(ENV_MAX_DOCUMENT_PAGES) {
            config.max_document_pages = value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|pages| *pages > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: ENV_MAX_DOCUMENT_PAGES,
                    value,
                })?;
        }

        if let Some(value) = lookup(ENV_DEBUG) {
            config.debug = parse_flag(&value).ok_or(ConfigError::InvalidValue {
                key: ENV_DEBUG,
                value,
            })?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig, ENV_DEBUG, ENV_DOCUMENTS_DIR, ENV_MAX_DOCUMENT_PAGES};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = StoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.documents_dir, PathBuf::from("documents"));
        assert_eq!(config.max_document_pages, 500);
        assert!(!config.debug);
    }

    #[test]
    fn overrides_are_applied() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            (ENV_DOCUMENTS_DIR, " /srv/docs "),
            (ENV_MAX_DOCUMENT_PAGES, "42"),
            (ENV_DEBUG, "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.documents_dir, PathBuf::from("/srv/docs"));
        assert_eq!(config.max_document_pages, 42);
        assert!(config.debug);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = StoreConfig::from_lookup(lookup_from(&[(ENV_MAX_DOCUMENT_PAGES, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_MAX_DOCUMENT_PAGES));

        let err = StoreConfig::from_lookup(lookup_from(&[(ENV_DOCUMENTS_DIR, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty(ENV_DOCUMENTS_DIR));

        let err = StoreConfig::from_lookup(lookup_from(&[(ENV_DEBUG, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_DEBUG));
    }
}
