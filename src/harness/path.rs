//! Field paths into a JSON response body
//!
//! Syntax:
//! - `user.role` walks object keys
//! - `trips.0.slug` indexes into arrays
//! - `departures[allow_free_rsvp=true].id` picks an array element whose
//!   field equals a literal; `!=` picks one whose field differs or is absent
//!
//! A filter picks the last matching element. An empty path selects the root.

use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Key(String),
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    field: String,
    negate: bool,
    value: String,
}

impl Filter {
    fn parse(inner: &str) -> Result<Self, String> {
        let (field, negate, value) = if let Some((f, v)) = inner.split_once("!=") {
            (f, true, v)
        } else if let Some((f, v)) = inner.split_once('=') {
            (f, false, v)
        } else {
            return Err(format!("filter '[{}]' needs '=' or '!='", inner));
        };

        let field = field.trim();
        if field.is_empty() {
            return Err(format!("filter '[{}]' has no field name", inner));
        }
        Ok(Self {
            field: field.to_string(),
            negate,
            value: value.trim().to_string(),
        })
    }

    fn accepts(&self, element: &Value) -> bool {
        let hit = element
            .get(&self.field)
            .is_some_and(|v| matches_literal(v, &self.value));
        hit != self.negate
    }
}

/// Compare a JSON value with the text of a filter literal
fn matches_literal(value: &Value, literal: &str) -> bool {
    match value {
        Value::String(s) => s == literal,
        Value::Bool(b) => literal == if *b { "true" } else { "false" },
        Value::Null => literal == "null",
        Value::Number(n) => match (literal.parse::<f64>(), n.as_f64()) {
            (Ok(l), Some(v)) => l == v,
            _ => n.to_string() == literal,
        },
        other => other.to_string() == literal,
    }
}

/// A parsed field path
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut segments = Vec::new();

        for part in split_top_level(raw)? {
            let (key, filter) = match part.find('[') {
                Some(open) => {
                    if !part.ends_with(']') {
                        return Err(format!("'{}': text after ']' in '{}'", raw, part));
                    }
                    (&part[..open], Some(&part[open + 1..part.len() - 1]))
                }
                None => (part, None),
            };

            if key.is_empty() && filter.is_none() {
                return Err(format!("'{}': empty segment", raw));
            }
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }
            if let Some(inner) = filter {
                segments.push(Segment::Filter(Filter::parse(inner)?));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolve the path against a JSON document
    pub fn select<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = match segment {
                Segment::Key(key) => match current {
                    Value::Object(map) => map.get(key)?,
                    Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                    _ => return None,
                },
                Segment::Filter(filter) => current
                    .as_array()?
                    .iter()
                    .rev()
                    .find(|e| filter.accepts(e))?,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            f.write_str("<body>")
        } else {
            f.write_str(&self.raw)
        }
    }
}

/// Split on dots that are not inside a `[...]` filter
fn split_top_level(raw: &str) -> Result<Vec<&str>, String> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("'{}': unmatched ']'", raw))?
            }
            '.' if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(format!("'{}': unterminated '['", raw));
    }
    parts.push(&raw[start..]);
    Ok(parts)
}
