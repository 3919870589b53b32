//! Probe: one declarative HTTP call plus an assertion over its response

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use super::check::{abbreviate, length_of, resolve_path, Check};
use super::context::{placeholders, value_placeholders, RunContext};
use super::outcome::{Category, Failure};
use super::session::{parse_set_cookie, SessionContext};
use crate::http::{HttpClient, RequestSpec};

/// A received response as assertions see it
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    /// Parsed body, `None` when it is not valid JSON
    pub json: Option<Value>,
    pub raw: String,
}

/// Assertion written in Rust rather than as declarative checks
pub type AssertFn = Arc<dyn Fn(&ProbeResponse) -> Result<(), String> + Send + Sync>;

/// How a response is judged once its status matched
#[derive(Clone)]
pub enum Assertion {
    /// All checks must hold, evaluated in order; the first failure wins
    Checks(Vec<Check>),
    Custom(AssertFn),
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Checks(checks) => f.debug_tuple("Checks").field(checks).finish(),
            Assertion::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Copy a field of a passing response into the Run Context
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Field path in the response body
    pub path: String,
    /// Run Context variable to bind
    pub into: String,
    /// Fail the probe when the field is absent
    #[serde(default)]
    pub required: bool,
    /// Bind the length of the field instead of the field itself
    #[serde(default)]
    pub length: bool,
}

/// Bind the response's session cookies to a named identity
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LoginEffect {
    pub identity: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// State changes a passing probe asks the runner to apply
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    pub bindings: Vec<(String, Value)>,
    pub login: Option<PendingLogin>,
    pub logout: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct PendingLogin {
    pub identity: String,
    pub cookies: Vec<(String, String)>,
    pub role: Option<String>,
}

/// Immutable description of one test case
#[derive(Debug, Clone)]
pub struct Probe {
    pub name: String,
    pub category: Category,
    pub method: Method,
    /// Path template relative to the base URL
    pub path: String,
    /// Body template, sent as JSON
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    /// Identity whose cookies accompany the request
    pub identity: Option<String>,
    pub expect_status: Option<u16>,
    /// Whether an unparsable body fails the probe
    pub expect_json: bool,
    pub timeout: Option<Duration>,
    pub assertion: Assertion,
    /// Bindings that must exist before the probe may run
    pub requires: Vec<String>,
    pub extract: Vec<Extraction>,
    pub login: Option<LoginEffect>,
    pub logout: Option<String>,
}

impl Probe {
    pub fn new(category: Category, name: &str, method: Method, path: &str) -> Self {
        Self {
            name: name.to_string(),
            category,
            method,
            path: path.to_string(),
            body: None,
            headers: Vec::new(),
            identity: None,
            expect_status: None,
            expect_json: true,
            timeout: None,
            assertion: Assertion::Checks(Vec::new()),
            requires: Vec::new(),
            extract: Vec::new(),
            login: None,
            logout: None,
        }
    }

    pub fn get(category: Category, name: &str, path: &str) -> Self {
        Self::new(category, name, Method::GET, path)
    }

    pub fn post(category: Category, name: &str, path: &str, body: Value) -> Self {
        Self::new(category, name, Method::POST, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn as_identity(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.expect_status = Some(status);
        self
    }

    pub fn allow_non_json(mut self) -> Self {
        self.expect_json = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Append a declarative check; replaces a custom assertion
    pub fn check(mut self, check: Check) -> Self {
        match &mut self.assertion {
            Assertion::Checks(checks) => checks.push(check),
            Assertion::Custom(_) => self.assertion = Assertion::Checks(vec![check]),
        }
        self
    }

    pub fn assert_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&ProbeResponse) -> Result<(), String> + Send + Sync + 'static,
    {
        self.assertion = Assertion::Custom(Arc::new(f));
        self
    }

    pub fn requires(mut self, binding: &str) -> Self {
        self.requires.push(binding.to_string());
        self
    }

    pub fn extract(mut self, extraction: Extraction) -> Self {
        self.extract.push(extraction);
        self
    }

    pub fn login(mut self, identity: &str, role: Option<&str>) -> Self {
        self.login = Some(LoginEffect {
            identity: identity.to_string(),
            role: role.map(str::to_string),
        });
        self
    }

    pub fn logout(mut self, identity: &str) -> Self {
        self.logout = Some(identity.to_string());
        self
    }

    /// Every binding this probe reads, explicit requirements first
    pub fn needed_bindings(&self) -> Vec<String> {
        let mut names = self.requires.clone();
        names.extend(placeholders(&self.path));
        if let Some(body) = &self.body {
            value_placeholders(body, &mut names);
        }
        for (_, value) in &self.headers {
            names.extend(placeholders(value));
        }
        if let Assertion::Checks(checks) = &self.assertion {
            names.extend(checks.iter().flat_map(Check::placeholders));
        }
        for extraction in &self.extract {
            names.extend(placeholders(&extraction.path));
        }

        let mut seen = std::collections::HashSet::new();
        names.retain(|n| seen.insert(n.clone()));
        names
    }

    /// Run the probe
    ///
    /// Nothing is sent when the identity or a binding is missing; a missing
    /// identity is reported first. On success the returned [`Effects`]
    /// describe what the runner should bind or log in; the probe itself never
    /// touches the contexts.
    pub async fn execute(
        &self,
        client: &HttpClient,
        session: &SessionContext,
        ctx: &RunContext,
    ) -> Result<Effects, Failure> {
        let cookie = match &self.identity {
            Some(name) => Some(
                session
                    .get(name)
                    .map_err(|_| Failure::identity_missing(name))?
                    .cookie_header(),
            ),
            None => None,
        };

        if let Some(name) = self.needed_bindings().iter().find(|n| !ctx.contains(n)) {
            return Err(Failure::missing_binding(name));
        }

        let path = ctx
            .render_str(&self.path)
            .map_err(|u| Failure::missing_binding(&u.0))?;
        let body = self
            .body
            .as_ref()
            .map(|b| ctx.render_value(b))
            .transpose()
            .map_err(|u| Failure::missing_binding(&u.0))?;
        let headers = self
            .headers
            .iter()
            .map(|(k, v)| ctx.render_str(v).map(|v| (k.clone(), v)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|u| Failure::missing_binding(&u.0))?;

        let response = client
            .send(RequestSpec {
                method: self.method.clone(),
                path: &path,
                body: body.as_ref(),
                headers: &headers,
                cookie,
                timeout: self.timeout,
            })
            .await
            .map_err(Failure::transport)?;

        if let Some(expected) = self.expect_status {
            if response.status != expected {
                return Err(Failure::unexpected_status(expected, response.status));
            }
        }

        let parsed = serde_json::from_str::<Value>(&response.body);
        if self.expect_json {
            if let Err(e) = &parsed {
                return Err(Failure::assertion(format!(
                    "response body is not JSON ({}): {}",
                    e,
                    abbreviate(&Value::String(response.body.clone()))
                )));
            }
        }

        let view = ProbeResponse {
            status: response.status,
            json: parsed.ok(),
            raw: response.body,
        };
        self.judge(&view, ctx)?;

        let mut effects = Effects {
            bindings: self.extract_bindings(&view, ctx)?,
            login: None,
            logout: self.logout.clone(),
        };
        if let Some(login) = &self.login {
            effects.login = Some(PendingLogin {
                identity: login.identity.clone(),
                cookies: response
                    .set_cookies
                    .iter()
                    .filter_map(|h| parse_set_cookie(h))
                    .collect(),
                role: login.role.clone(),
            });
        }
        Ok(effects)
    }

    fn judge(&self, response: &ProbeResponse, ctx: &RunContext) -> Result<(), Failure> {
        match &self.assertion {
            Assertion::Checks(checks) => {
                let body = response.json.as_ref().unwrap_or(&Value::Null);
                checks.iter().try_for_each(|c| c.evaluate(body, ctx))
            }
            Assertion::Custom(f) => (**f)(response).map_err(Failure::assertion),
        }
    }

    fn extract_bindings(
        &self,
        response: &ProbeResponse,
        ctx: &RunContext,
    ) -> Result<Vec<(String, Value)>, Failure> {
        let body = response.json.as_ref().unwrap_or(&Value::Null);
        let mut bindings = Vec::new();

        for extraction in &self.extract {
            let path = resolve_path(&extraction.path, ctx)?;
            let value = match path.select(body) {
                Some(v) if extraction.length => length_of(v).map(Value::from),
                Some(v) => Some(v.clone()),
                None => None,
            };

            match value {
                Some(v) => bindings.push((extraction.into.clone(), v)),
                None if extraction.required => {
                    return Err(Failure::assertion(format!(
                        "{}: required field for '{}' not found",
                        path, extraction.into
                    )))
                }
                None => {
                    tracing::debug!("{}: optional field absent, '{}' left unbound", path, extraction.into)
                }
            }
        }
        Ok(bindings)
    }
}
