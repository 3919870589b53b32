//! Configuration file handling

use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use super::paths::config_path;
use super::{Error, Result};
use crate::harness::Category;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Target server settings
    #[serde(default)]
    pub target: TargetConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Category enable/disable lists
    #[serde(default)]
    pub categories: CategoryFilter,
}

/// Target server settings
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Base URL every probe path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Default timeout for a single probe request
    #[serde(default = "default_request")]
    pub request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: default_request(),
        }
    }
}

fn default_request() -> u64 {
    10
}

/// Which categories to run
///
/// When `enabled` is set only those categories run; `disabled` is applied
/// afterwards and always wins.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct CategoryFilter {
    #[serde(default)]
    pub enabled: Option<Vec<String>>,

    #[serde(default)]
    pub disabled: Vec<String>,
}

impl CategoryFilter {
    /// Check that every listed name is a known category
    pub fn validate(&self) -> Result<()> {
        let enabled = self.enabled.iter().flatten();
        for name in enabled.chain(self.disabled.iter()) {
            Category::from_str(name)?;
        }
        Ok(())
    }

    /// Whether a category should run under this filter
    pub fn allows(&self, category: Category) -> bool {
        let named = |names: &[String]| {
            names
                .iter()
                .any(|n| Category::from_str(n).ok() == Some(category))
        };

        if let Some(enabled) = &self.enabled {
            if !named(enabled) {
                return false;
            }
        }
        !named(&self.disabled)
    }
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.categories.validate()?;
        Ok(config)
    }

    /// Parse and validate the configured base URL
    ///
    /// Only absolute `http`/`https` URLs with a host are accepted. A trailing
    /// slash is dropped so probe paths can always start with `/`.
    pub fn base_url(&self) -> Result<String> {
        let raw = self.target.base_url.trim();
        let url = Url::parse(raw).map_err(|e| Error::invalid_base_url(raw, &e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::invalid_base_url(
                    raw,
                    &format!("unsupported scheme '{}'", other),
                ))
            }
        }
        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(Error::invalid_base_url(raw, "missing host")),
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(Error::invalid_base_url(
                raw,
                "query strings and fragments are not allowed",
            ));
        }

        Ok(raw.trim_end_matches('/').to_string())
    }
}
