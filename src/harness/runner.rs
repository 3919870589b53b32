//! Scenario Runner
//!
//! Executes suites strictly in order, one probe at a time, threading the
//! Session and Run Context through every probe. A probe failure is recorded
//! and the run carries on; every declared probe yields exactly one outcome.

use std::io::Write;

use colored::Colorize;

use super::context::RunContext;
use super::ledger::Ledger;
use super::outcome::{Failure, Outcome};
use super::probe::{Effects, Probe};
use super::report;
use super::scenario::Suite;
use super::session::SessionContext;
use crate::http::HttpClient;

/// Where progress lines go while the run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Stdout,
    /// Keeps stdout free for a machine-readable report
    Stderr,
    Silent,
}

/// Runs suites against one target
///
/// `run` consumes the runner, so a finished ledger can never be extended.
pub struct ScenarioRunner {
    client: HttpClient,
    session: SessionContext,
    context: RunContext,
    ledger: Ledger,
    echo: Echo,
}

impl ScenarioRunner {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            session: SessionContext::new(),
            context: RunContext::new(),
            ledger: Ledger::new(),
            echo: Echo::Stdout,
        }
    }

    pub fn with_echo(mut self, echo: Echo) -> Self {
        self.echo = echo;
        self
    }

    /// Execute every suite in order and return the final ledger
    pub async fn run(mut self, suites: &[Suite]) -> Ledger {
        let total: usize = suites.iter().map(|s| s.probes.len()).sum();
        tracing::info!(
            "running {} probe(s) in {} categories against {}",
            total,
            suites.len(),
            self.client.base_url()
        );

        for suite in suites {
            self.ledger.open(suite.category);
            self.emit(&format!(
                "\n{} {}",
                "Testing".cyan(),
                suite.category.title().cyan().bold()
            ));

            for probe in &suite.probes {
                let outcome = self.run_probe(probe).await;
                self.emit(&report::outcome_line(&outcome));
                self.ledger.record(outcome);
            }
        }

        tracing::info!(
            "run completed: {} outcome(s), all passed: {}",
            self.ledger.len(),
            self.ledger.all_passed()
        );
        self.ledger
    }

    async fn run_probe(&mut self, probe: &Probe) -> Outcome {
        let result = match probe
            .execute(&self.client, &self.session, &self.context)
            .await
        {
            Ok(effects) => self.apply(effects),
            Err(failure) => Err(failure),
        };

        if let Err(failure) = &result {
            tracing::debug!("{} / {} failed: {:?}", probe.category, probe.name, failure.kind);
        }
        Outcome::from_result(probe.category, &probe.name, result)
    }

    /// Apply a passing probe's declared effects
    ///
    /// A login whose response set no session cookie turns the pass into a
    /// failure; nothing is bound in that case.
    fn apply(&mut self, effects: Effects) -> Result<(), Failure> {
        if let Some(login) = effects.login {
            self.session
                .login(&login.identity, login.cookies, login.role)
                .map_err(|e| Failure::assertion(e.to_string()))?;
        }
        if let Some(identity) = effects.logout {
            self.session.logout(&identity);
        }
        for (name, value) in effects.bindings {
            self.context.bind(name, value);
        }
        Ok(())
    }

    fn emit(&self, line: &str) {
        match self.echo {
            Echo::Stdout => println!("{}", line),
            Echo::Stderr => {
                let _ = writeln!(std::io::stderr(), "{}", line);
            }
            Echo::Silent => {}
        }
    }
}
