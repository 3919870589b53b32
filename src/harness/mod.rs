//! HTTP conformance harness
//!
//! Probes are declared as data (usually loaded from a YAML scenario), run in
//! order by the [`ScenarioRunner`] against one base URL, and every result is
//! collected into a [`Ledger`] for the report. Identities (cookie sessions)
//! and values discovered along the way are carried between probes by the
//! [`SessionContext`] and [`RunContext`].

mod check;
mod context;
mod ledger;
mod outcome;
mod path;
mod probe;
pub mod report;
mod runner;
mod scenario;
mod session;

pub use check::{is_truthy, Check};
pub use context::{RunContext, Unbound};
pub use ledger::{CategoryRecord, CategorySummary, Ledger, Summary};
pub use outcome::{Category, Failure, FailureKind, Outcome};
pub use path::FieldPath;
pub use probe::{
    AssertFn, Assertion, Effects, Extraction, LoginEffect, PendingLogin, Probe, ProbeResponse,
};
pub use runner::{Echo, ScenarioRunner};
pub use scenario::{Scenario, Suite, BUNDLED_SCENARIO};
pub use session::{parse_set_cookie, Identity, SessionContext};
