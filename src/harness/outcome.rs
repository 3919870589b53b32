//! Categories, failure kinds and recorded outcomes

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::Error;

/// Group a probe belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Auth,
    Trips,
    Bookings,
    Admin,
    Payments,
    Database,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Auth,
        Category::Trips,
        Category::Bookings,
        Category::Admin,
        Category::Payments,
        Category::Database,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Auth => "auth",
            Category::Trips => "trips",
            Category::Bookings => "bookings",
            Category::Admin => "admin",
            Category::Payments => "payments",
            Category::Database => "database",
        }
    }

    /// Heading printed before the category's probes run
    pub fn title(self) -> &'static str {
        match self {
            Category::Auth => "Authentication",
            Category::Trips => "Trips API",
            Category::Bookings => "Bookings",
            Category::Admin => "Admin Dashboard",
            Category::Payments => "Payments",
            Category::Database => "Data Validation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// Why a probe failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused, DNS failure, timeout
    Transport,
    /// Status differs from the declared expectation
    UnexpectedStatus,
    /// Status matched but the body did not satisfy the assertion
    AssertionFailure,
    /// A binding the probe needs was never set by an earlier probe
    MissingPrecondition,
    /// The probe runs as an identity that never logged in
    IdentityMissing,
}

/// A failed probe, before it is stamped into an [`Outcome`]
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn transport(cause: impl fmt::Display) -> Self {
        Self::new(FailureKind::Transport, format!("transport error: {}", cause))
    }

    pub fn unexpected_status(expected: u16, actual: u16) -> Self {
        Self::new(
            FailureKind::UnexpectedStatus,
            format!("expected status {}, got {}", expected, actual),
        )
    }

    pub fn assertion(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::AssertionFailure, detail)
    }

    pub fn missing_binding(name: &str) -> Self {
        Self::new(
            FailureKind::MissingPrecondition,
            format!("missing binding '{}': no earlier probe produced it", name),
        )
    }

    pub fn identity_missing(name: &str) -> Self {
        Self::new(
            FailureKind::IdentityMissing,
            format!("identity '{}' has not logged in", name),
        )
    }
}

/// Recorded result of executing one probe
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub probe: String,
    pub category: Category,
    pub passed: bool,
    /// Empty on success
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    pub timestamp: DateTime<Utc>,
}

impl Outcome {
    pub fn pass(category: Category, probe: &str) -> Self {
        Self {
            probe: probe.to_string(),
            category,
            passed: true,
            detail: String::new(),
            kind: None,
            timestamp: Utc::now(),
        }
    }

    pub fn fail(category: Category, probe: &str, failure: Failure) -> Self {
        Self {
            probe: probe.to_string(),
            category,
            passed: false,
            detail: failure.detail,
            kind: Some(failure.kind),
            timestamp: Utc::now(),
        }
    }

    pub fn from_result(category: Category, probe: &str, result: Result<(), Failure>) -> Self {
        match result {
            Ok(()) => Self::pass(category, probe),
            Err(failure) => Self::fail(category, probe, failure),
        }
    }
}
