//! Scenario files
//!
//! A scenario is an ordered list of category blocks, each an ordered list of
//! probes, deserialized from YAML:
//!
//! ```yaml
//! name: Travel booking API
//! categories:
//!   - category: auth
//!     probes:
//!       - name: Admin login
//!         method: POST
//!         path: /auth/login
//!         body: { type: admin }
//!         login: { identity: admin, role: admin }
//!         expect:
//!           status: 200
//!           checks:
//!             - { check: equals, path: user.role, value: admin }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use super::check::Check;
use super::outcome::Category;
use super::path::FieldPath;
use super::probe::{Assertion, Extraction, LoginEffect, Probe};
use crate::common::{Error, Result};

/// Source of the scenario bundled into the binary
pub const BUNDLED_SCENARIO: &str = include_str!("../../scenarios/travel_api.yaml");

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
struct ScenarioFile {
    name: String,
    description: Option<String>,
    categories: Vec<SuiteSpec>,
}

#[derive(Deserialize, Debug)]
struct SuiteSpec {
    category: Category,
    #[serde(default)]
    probes: Vec<ProbeSpec>,
}

/// A single probe as written in a scenario file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ProbeSpec {
    name: String,
    #[serde(default = "default_method")]
    method: String,
    path: String,
    body: Option<Value>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    /// Identity to run as
    #[serde(rename = "as")]
    identity: Option<String>,
    /// Timeout in seconds, overriding the global one
    timeout: Option<u64>,
    #[serde(default)]
    expect: ExpectSpec,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    extract: Vec<Extraction>,
    login: Option<LoginEffect>,
    logout: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Expectations for a probe's response
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ExpectSpec {
    status: Option<u16>,
    /// Whether the body must be JSON (default: true)
    #[serde(default = "default_json")]
    json: bool,
    #[serde(default)]
    checks: Vec<Check>,
}

impl Default for ExpectSpec {
    fn default() -> Self {
        Self {
            status: None,
            json: default_json(),
            checks: Vec::new(),
        }
    }
}

fn default_json() -> bool {
    true
}

/// Probes of one category, in declaration order
#[derive(Debug, Clone)]
pub struct Suite {
    pub category: Category,
    pub probes: Vec<Probe>,
}

/// A validated scenario ready to run
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub suites: Vec<Suite>,
}

impl Scenario {
    /// Load and validate a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Yaml(inner) => Error::scenario(
                &path.display().to_string(),
                format!("failed to parse: {}", inner),
            ),
            other => other,
        })
    }

    /// The scenario compiled into the binary
    pub fn bundled() -> Result<Self> {
        Self::from_yaml(BUNDLED_SCENARIO)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: ScenarioFile = serde_yaml::from_str(content)?;
        let mut suites = Vec::with_capacity(file.categories.len());
        let mut seen: HashSet<(Category, String)> = HashSet::new();

        for block in file.categories {
            let mut probes = Vec::with_capacity(block.probes.len());
            for spec in block.probes {
                if !seen.insert((block.category, spec.name.clone())) {
                    return Err(Error::DuplicateProbe {
                        category: block.category.to_string(),
                        probe: spec.name,
                    });
                }
                probes.push(spec.into_probe(&file.name, block.category)?);
            }
            suites.push(Suite {
                category: block.category,
                probes,
            });
        }

        Ok(Self {
            name: file.name,
            description: file.description,
            suites,
        })
    }

    pub fn probe_count(&self) -> usize {
        self.suites.iter().map(|s| s.probes.len()).sum()
    }

    /// Keep only the suites a predicate accepts
    pub fn retain_categories(&mut self, mut keep: impl FnMut(Category) -> bool) {
        self.suites.retain(|s| keep(s.category));
    }
}

impl ProbeSpec {
    fn into_probe(self, scenario: &str, category: Category) -> Result<Probe> {
        let invalid = |reason: String| {
            Error::scenario(scenario, format!("{} / {}: {}", category, self.name, reason))
        };

        if self.name.trim().is_empty() {
            return Err(invalid("probe name is empty".to_string()));
        }
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| invalid(format!("invalid HTTP method '{}'", self.method)))?;
        if let Some(status) = self.expect.status {
            if !(100..=599).contains(&status) {
                return Err(invalid(format!("expected status {} is not an HTTP status", status)));
            }
        }
        if self.timeout == Some(0) {
            return Err(invalid("timeout must be at least 1 second".to_string()));
        }

        let paths = self
            .expect
            .checks
            .iter()
            .flat_map(Check::paths)
            .chain(self.extract.iter().map(|e| e.path.as_str()));
        for path in paths {
            FieldPath::parse(path).map_err(|e| invalid(format!("bad field path {}", e)))?;
        }

        let mut probe = Probe::new(category, &self.name, method, &self.path);
        probe.body = self.body;
        probe.headers = self.headers.into_iter().collect();
        probe.identity = self.identity;
        probe.expect_status = self.expect.status;
        probe.expect_json = self.expect.json;
        probe.timeout = self.timeout.map(Duration::from_secs);
        probe.assertion = Assertion::Checks(self.expect.checks);
        probe.requires = self.requires;
        probe.extract = self.extract;
        probe.login = self.login;
        probe.logout = self.logout;
        Ok(probe)
    }
}
