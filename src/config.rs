//! Run configuration and catalog descriptors.
//!
//! Configuration is TOML. The built-in file (`config.toml` at the crate root)
//! is always the base; a user file at `$XDG_CONFIG_HOME/libcat/config.toml`
//! (or `$HOME/.config/libcat/config.toml`) replaces its scalar settings and
//! adds or replaces catalog descriptors by short-code. CLI flags are applied
//! last through [`ConfigOverrides`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{BackendKind, with_scheme};
use crate::fields::Classifier;
use crate::record::RecordSchema;
use crate::retry::RetryPolicy;

/// Built-in configuration text.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config.toml");

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("cannot read config file {path}: {source}\n  Suggestion: Check the path passed to --config")]
    Read {
        /// File path
        path: PathBuf,
        /// IO failure
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("cannot parse config {origin}: {source}\n  Suggestion: Compare with the default config.toml")]
    Parse {
        /// File path or `built-in`
        origin: String,
        /// TOML failure
        #[source]
        source: toml::de::Error,
    },

    /// The configuration parsed but is unusable
    #[error("invalid configuration: {reason}\n  Suggestion: {suggestion}")]
    Invalid {
        /// What is wrong
        reason: String,
        /// How to fix it
        suggestion: &'static str,
    },
}

impl ConfigError {
    fn invalid(reason: impl Into<String>, suggestion: &'static str) -> Self {
        Self::Invalid {
            reason: reason.into(),
            suggestion,
        }
    }
}

/// Static description of one catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    /// Protocol variant.
    pub backend: BackendKind,
    /// Endpoint; a scheme-less host gets `https://`.
    pub base_url: String,
    /// SRU index the identifier is matched against (e.g. `bath.isbn`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Alma institution code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inst_code: Option<String>,
    /// Declared record schema; must agree with the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordSchema>,
}

impl CatalogDescriptor {
    /// Schema of records this catalog returns.
    #[must_use]
    pub fn record_schema(&self) -> RecordSchema {
        self.record_type
            .unwrap_or_else(|| self.backend.record_schema())
    }
}

/// Per-run settings plus the catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog short-codes in search order.
    pub order: Vec<String>,
    /// Seconds between retries and between alternate attempts.
    pub wait: u64,
    /// Retries after a failed request.
    pub retries: u32,
    /// Per-request timeout in seconds.
    pub timeout: u64,
    /// MARC language allow-list; empty accepts all.
    pub languages: Vec<String>,
    /// Classifiers to resolve.
    pub classifiers: Vec<Classifier>,
    /// Whether to expand ISBNs into alternate editions.
    pub alt_isbns: bool,
    /// Maximum alternate ISBNs attempted.
    pub max_alts: usize,
    /// Descriptors keyed by short-code.
    pub catalogs: BTreeMap<String, CatalogDescriptor>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            order: ["loc", "hathi", "openl", "bdirect", "yale"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            wait: 1,
            retries: 1,
            timeout: 30,
            languages: Vec::new(),
            classifiers: vec![
                Classifier::Record,
                Classifier::Lcc,
                Classifier::Ddc,
                Classifier::Lcsh,
            ],
            alt_isbns: true,
            max_alts: 50,
            catalogs: BTreeMap::new(),
        }
    }
}

/// One-run overrides, typically from CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replaces `order`.
    pub catalogs: Option<Vec<String>>,
    /// Replaces `wait`.
    pub wait: Option<u64>,
    /// Replaces `retries`.
    pub retries: Option<u32>,
    /// Replaces `timeout`.
    pub timeout: Option<u64>,
    /// Replaces `languages`.
    pub languages: Option<Vec<String>>,
    /// Replaces `classifiers`.
    pub classifiers: Option<Vec<Classifier>>,
    /// Replaces `alt_isbns`.
    pub alt_isbns: Option<bool>,
    /// Replaces `max_alts`.
    pub max_alts: Option<usize>,
}

impl AppConfig {
    /// Parses the built-in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the embedded file is broken.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML, "built-in")
    }

    /// Parses configuration text without merging or validating.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML or unknown values.
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Loads `path` and merges it over the built-in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user = Self::from_toml_str(&text, &path.display().to_string())?;
        let mut merged = Self::builtin()?;
        merged.merge_user(user);
        debug!(path = %path.display(), "loaded config file");
        Ok(merged)
    }

    /// Loads the explicit path, else the default path if it exists, else the
    /// built-in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a chosen file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => {
                info!("no config file found; using built-in configuration");
                Self::builtin()
            }
        }
    }

    fn merge_user(&mut self, mut user: Self) {
        let mut catalogs = std::mem::take(&mut self.catalogs);
        catalogs.append(&mut user.catalogs);
        user.catalogs = catalogs;
        *self = user;
    }

    /// Applies one-run overrides.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(order) = overrides.catalogs {
            self.order = order;
        }
        if let Some(wait) = overrides.wait {
            self.wait = wait;
        }
        if let Some(retries) = overrides.retries {
            self.retries = retries;
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        if let Some(languages) = overrides.languages {
            self.languages = languages;
        }
        if let Some(classifiers) = overrides.classifiers {
            self.classifiers = classifiers;
        }
        if let Some(alt_isbns) = overrides.alt_isbns {
            self.alt_isbns = alt_isbns;
        }
        if let Some(max_alts) = overrides.max_alts {
            self.max_alts = max_alts;
        }
    }

    /// Checks that the configuration can drive a resolution.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout == 0 {
            return Err(ConfigError::invalid(
                "timeout must be greater than zero",
                "Set timeout to a number of seconds, e.g. 30",
            ));
        }
        if self.classifiers.is_empty() {
            return Err(ConfigError::invalid(
                "no classifiers requested",
                "Request at least one of record, lcc, ddc, lcsh, isbn",
            ));
        }
        if let Some(code) = self
            .languages
            .iter()
            .find(|code| code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()))
        {
            return Err(ConfigError::invalid(
                format!("language code '{code}' is not three letters"),
                "Use MARC language codes such as eng, fre, ger",
            ));
        }

        for name in &self.order {
            let Some(descriptor) = self.catalogs.get(name) else {
                return Err(ConfigError::invalid(
                    format!("catalog '{name}' has no [catalogs.{name}] table"),
                    "Add the catalog table or remove it from order",
                ));
            };
            validate_descriptor(name, descriptor)?;
        }
        Ok(())
    }

    /// Descriptor for short-code `name`.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&CatalogDescriptor> {
        self.catalogs.get(name)
    }

    /// Retry policy built from `retries` and `wait`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.wait_duration())
    }

    /// `wait` as a duration.
    #[must_use]
    pub fn wait_duration(&self) -> Duration {
        Duration::from_secs(self.wait)
    }

    /// `timeout` as a duration.
    #[must_use]
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

fn validate_descriptor(name: &str, descriptor: &CatalogDescriptor) -> Result<(), ConfigError> {
    if descriptor.base_url.trim().is_empty() {
        return Err(ConfigError::invalid(
            format!("catalog '{name}' has an empty base_url"),
            "Set base_url to the catalog endpoint",
        ));
    }
    if let Err(e) = url::Url::parse(&with_scheme(&descriptor.base_url)) {
        return Err(ConfigError::invalid(
            format!("catalog '{name}' base_url '{}' is not a URL: {e}", descriptor.base_url),
            "Use a host such as openlibrary.org or a full http(s) URL",
        ));
    }
    match descriptor.backend {
        BackendKind::Sru if descriptor.query.as_deref().is_none_or(str::is_empty) => {
            return Err(ConfigError::invalid(
                format!("SRU catalog '{name}' has no query index"),
                "Set query, e.g. query = \"bath.isbn\"",
            ));
        }
        BackendKind::Alma if descriptor.inst_code.as_deref().is_none_or(str::is_empty) => {
            return Err(ConfigError::invalid(
                format!("Alma catalog '{name}' has no inst_code"),
                "Set inst_code, e.g. inst_code = \"01YALE_INST\"",
            ));
        }
        _ => {}
    }
    if let Some(declared) = descriptor.record_type
        && declared != descriptor.backend.record_schema()
    {
        return Err(ConfigError::invalid(
            format!(
                "catalog '{name}' declares record_type {declared} but {} returns {}",
                descriptor.backend,
                descriptor.backend.record_schema()
            ),
            "Remove record_type or set it to match the backend",
        ));
    }
    Ok(())
}

/// Default user config file location.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    resolve_app_dir(
        sanitize_env_path(std::env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(std::env::var_os("HOME")).map(|home| home.join(".config")),
    )
    .map(|dir| dir.join("config.toml"))
}

/// Default ledger database location.
#[must_use]
pub fn default_db_path() -> Option<PathBuf> {
    resolve_app_dir(
        sanitize_env_path(std::env::var_os("XDG_DATA_HOME")),
        sanitize_env_path(std::env::var_os("HOME")).map(|home| home.join(".local").join("share")),
    )
    .map(|dir| dir.join("libcat.db"))
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

fn resolve_app_dir(xdg_dir: Option<PathBuf>, home_fallback: Option<PathBuf>) -> Option<PathBuf> {
    xdg_dir.or(home_fallback).map(|dir| dir.join("libcat"))
}
