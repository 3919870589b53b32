//! Run Context: values carried from one probe to the next
//!
//! Probes refer to bound values with `${name}` placeholders in their path,
//! body, headers and checks. A placeholder that makes up a whole JSON string
//! is replaced by the bound value itself, so numbers and objects keep their
//! type; a placeholder embedded in a longer string is spliced in as text.

use std::collections::BTreeMap;

use serde_json::Value;

/// A `${name}` placeholder with no bound value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unbound(pub String);

/// Run-scoped bag of named values
#[derive(Debug, Default, Clone)]
pub struct RunContext {
    values: BTreeMap<String, Value>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        tracing::debug!("bind {} = {}", name, value);
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Substitute every placeholder in a string
    pub fn render_str(&self, template: &str) -> Result<String, Unbound> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start + 2..].find('}') else {
                break;
            };
            let name = &rest[start + 2..start + 2 + len];
            let value = self.get(name).ok_or_else(|| Unbound(name.to_string()))?;

            out.push_str(&rest[..start]);
            out.push_str(&display_value(value));
            rest = &rest[start + 3 + len..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Substitute placeholders throughout a JSON value
    pub fn render_value(&self, template: &Value) -> Result<Value, Unbound> {
        match template {
            Value::String(s) => match whole_placeholder(s) {
                Some(name) => self
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Unbound(name.to_string())),
                None => self.render_str(s).map(Value::String),
            },
            Value::Array(items) => items
                .iter()
                .map(|v| self.render_value(v))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut rendered = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    rendered.insert(k.clone(), self.render_value(v)?);
                }
                Ok(Value::Object(rendered))
            }
            other => Ok(other.clone()),
        }
    }
}

/// Text form of a bound value: strings without quotes, everything else as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn whole_placeholder(s: &str) -> Option<&str> {
    let name = s.strip_prefix("${")?.strip_suffix('}')?;
    (!name.contains('}') && !name.contains("${")).then_some(name)
}

/// Names of all placeholders referenced in a string
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        names.push(rest[start + 2..start + 2 + len].to_string());
        rest = &rest[start + 3 + len..];
    }
    names
}

/// Names of all placeholders referenced anywhere in a JSON value
pub fn value_placeholders(template: &Value, names: &mut Vec<String>) {
    match template {
        Value::String(s) => names.extend(placeholders(s)),
        Value::Array(items) => items.iter().for_each(|v| value_placeholders(v, names)),
        Value::Object(map) => map.values().for_each(|v| value_placeholders(v, names)),
        _ => {}
    }
}
