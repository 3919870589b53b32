//! Declarative assertions over a JSON response body

use serde::Deserialize;
use serde_json::Value;

use super::context::{placeholders, value_placeholders, RunContext, Unbound};
use super::outcome::Failure;
use super::path::FieldPath;

/// One assertion about a field of the response body
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum Check {
    /// Field equals a value (JSON equality after templating)
    Equals { path: String, value: Value },
    /// Field is absent or differs from a value
    NotEquals { path: String, value: Value },
    /// Field is present and truthy
    Truthy { path: String },
    /// Field is absent or falsy
    Falsy { path: String },
    /// Field is present (may be null)
    Exists { path: String },
    /// Field is an array (may be empty)
    IsArray { path: String },
    /// Field is a non-empty array, object or string
    NonEmpty { path: String },
    /// Field is a string containing a substring
    Contains { path: String, text: String },
    /// Field is a number strictly below the number at another path
    LessThan { path: String, than: String },
    /// Field is an array with at least `min` elements
    LengthAtLeast { path: String, min: Value },
}

/// JSON truthiness: null, false, 0, "", [] and {} are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Number of elements in a collection, or characters in a string
pub fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(a) => Some(a.len()),
        Value::Object(o) => Some(o.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

impl Check {
    pub fn path(&self) -> &str {
        match self {
            Check::Equals { path, .. }
            | Check::NotEquals { path, .. }
            | Check::Truthy { path }
            | Check::Falsy { path }
            | Check::Exists { path }
            | Check::IsArray { path }
            | Check::NonEmpty { path }
            | Check::Contains { path, .. }
            | Check::LessThan { path, .. }
            | Check::LengthAtLeast { path, .. } => path,
        }
    }

    /// Every field path this check reads
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Check::LessThan { path, than } => vec![path, than],
            other => vec![other.path()],
        }
    }

    /// Placeholders this check needs bound before it can run
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = self.paths().into_iter().flat_map(placeholders).collect();
        match self {
            Check::Equals { value, .. }
            | Check::NotEquals { value, .. }
            | Check::LengthAtLeast { min: value, .. } => value_placeholders(value, &mut names),
            Check::Contains { text, .. } => names.extend(placeholders(text)),
            _ => {}
        }
        names
    }

    /// Evaluate against a response body
    pub fn evaluate(&self, body: &Value, ctx: &RunContext) -> Result<(), Failure> {
        let path = resolve_path(self.path(), ctx)?;
        let actual = path.select(body);

        match self {
            Check::Equals { value, .. } => {
                let expected = ctx.render_value(value).map_err(unbound)?;
                match actual {
                    Some(v) if *v == expected => Ok(()),
                    Some(v) => Err(mismatch(&path, &format!("expected {}", expected), v)),
                    None => Err(missing(&path)),
                }
            }
            Check::NotEquals { value, .. } => {
                let unexpected = ctx.render_value(value).map_err(unbound)?;
                match actual {
                    Some(v) if *v == unexpected => {
                        Err(mismatch(&path, &format!("expected anything but {}", unexpected), v))
                    }
                    _ => Ok(()),
                }
            }
            Check::Truthy { .. } => match actual {
                Some(v) if is_truthy(v) => Ok(()),
                Some(v) => Err(mismatch(&path, "expected a truthy value", v)),
                None => Err(missing(&path)),
            },
            Check::Falsy { .. } => match actual {
                Some(v) if is_truthy(v) => Err(mismatch(&path, "expected a falsy value", v)),
                _ => Ok(()),
            },
            Check::Exists { .. } => actual.map(|_| ()).ok_or_else(|| missing(&path)),
            Check::IsArray { .. } => match actual {
                Some(Value::Array(_)) => Ok(()),
                Some(v) => Err(mismatch(&path, "expected an array", v)),
                None => Err(missing(&path)),
            },
            Check::NonEmpty { .. } => match actual {
                Some(v) if length_of(v).is_some_and(|n| n > 0) => Ok(()),
                Some(v) => Err(mismatch(&path, "expected a non-empty value", v)),
                None => Err(missing(&path)),
            },
            Check::Contains { text, .. } => {
                let needle = ctx.render_str(text).map_err(unbound)?;
                match actual {
                    Some(Value::String(s)) if s.contains(&needle) => Ok(()),
                    Some(v) => Err(mismatch(&path, &format!("expected text containing '{}'", needle), v)),
                    None => Err(missing(&path)),
                }
            }
            Check::LessThan { than, .. } => {
                let than = resolve_path(than, ctx)?;
                let bound = than
                    .select(body)
                    .ok_or_else(|| missing(&than))?
                    .as_f64()
                    .ok_or_else(|| Failure::assertion(format!("{}: not a number", than)))?;
                match actual {
                    Some(v) if v.as_f64().is_some_and(|n| n < bound) => Ok(()),
                    Some(v) => Err(mismatch(&path, &format!("expected a number below {} ({})", bound, than), v)),
                    None => Err(missing(&path)),
                }
            }
            Check::LengthAtLeast { min, .. } => {
                let min = ctx.render_value(min).map_err(unbound)?;
                let min = min
                    .as_u64()
                    .ok_or_else(|| Failure::assertion(format!("{}: minimum {} is not a count", path, min)))?;
                match actual {
                    Some(v @ Value::Array(items)) if (items.len() as u64) < min => Err(mismatch(
                        &path,
                        &format!("expected at least {} element(s), found {}", min, items.len()),
                        v,
                    )),
                    Some(Value::Array(_)) => Ok(()),
                    Some(v) => Err(mismatch(&path, "expected an array", v)),
                    None => Err(missing(&path)),
                }
            }
        }
    }
}

/// Render placeholders in a path template and parse it
pub(crate) fn resolve_path(template: &str, ctx: &RunContext) -> Result<FieldPath, Failure> {
    let rendered = ctx.render_str(template).map_err(unbound)?;
    FieldPath::parse(&rendered).map_err(|e| Failure::assertion(format!("bad field path {}", e)))
}

fn unbound(err: Unbound) -> Failure {
    Failure::missing_binding(&err.0)
}

fn missing(path: &FieldPath) -> Failure {
    Failure::assertion(format!("{}: field not found", path))
}

fn mismatch(path: &FieldPath, expectation: &str, actual: &Value) -> Failure {
    Failure::assertion(format!("{}: {}, got {}", path, expectation, abbreviate(actual)))
}

/// Compact rendering of a value for failure details
pub fn abbreviate(value: &Value) -> String {
    const LIMIT: usize = 200;
    let text = value.to_string();
    if text.chars().count() > LIMIT {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{}...", cut)
    } else {
        text
    }
}
