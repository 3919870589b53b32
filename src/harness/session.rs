//! Session Context: named identities and their cookies

use std::collections::HashMap;

use crate::common::{Error, Result};

/// A logged-in actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    /// Cookie name/value pairs captured from the login response
    pub cookies: Vec<(String, String)>,
    /// Role the scenario declares for this identity
    ///
    /// Informational only: shown by `list` and in logs, never compared with
    /// the server's answer. Scenarios assert the role with an explicit check
    /// such as `{ check: equals, path: user.role, value: admin }`.
    pub role: Option<String>,
}

impl Identity {
    /// Value for a `Cookie` request header
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Identities established during a run
#[derive(Debug, Default)]
pub struct SessionContext {
    identities: HashMap<String, Identity>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an identity, replacing any earlier login under the same name
    ///
    /// Fails when the login response carried no usable session cookie.
    pub fn login(
        &mut self,
        name: &str,
        cookies: Vec<(String, String)>,
        role: Option<String>,
    ) -> Result<&Identity> {
        if cookies.is_empty() {
            return Err(Error::AuthError(name.to_string()));
        }

        tracing::debug!(
            "identity '{}' ({}) logged in with {} cookie(s)",
            name,
            role.as_deref().unwrap_or("no declared role"),
            cookies.len()
        );
        let identity = Identity {
            name: name.to_string(),
            cookies,
            role,
        };
        self.identities.insert(name.to_string(), identity);
        self.get(name)
    }

    pub fn get(&self, name: &str) -> Result<&Identity> {
        self.identities
            .get(name)
            .ok_or_else(|| Error::IdentityNotFound(name.to_string()))
    }

    pub fn logout(&mut self, name: &str) -> Option<Identity> {
        tracing::debug!("identity '{}' logged out", name);
        self.identities.remove(name)
    }

    pub fn is_logged_in(&self, name: &str) -> bool {
        self.identities.contains_key(name)
    }
}

/// Extract the name/value pair from a `Set-Cookie` header
///
/// Deletion cookies (empty value, `Max-Age=0` or `Max-Age` below zero) yield
/// `None`.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return None;
    }

    let expired = parts.any(|attr| {
        attr.split_once('=').is_some_and(|(k, v)| {
            k.trim().eq_ignore_ascii_case("max-age") && v.trim().parse::<i64>().is_ok_and(|n| n <= 0)
        })
    });
    if expired {
        return None;
    }

    Some((name.to_string(), value.to_string()))
}
