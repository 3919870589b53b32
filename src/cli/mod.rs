//! CLI command handling
//!
//! Resolves configuration, loads scenarios and prints results.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::harness::{report, Echo, Ledger, Scenario, ScenarioRunner};
use crate::http::HttpClient;

/// Options for the run command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub base_url: Option<String>,
    pub timeout: Option<u64>,
    pub only: Vec<String>,
    pub skip: Vec<String>,
}

/// Dispatch a CLI command
///
/// Returns whether the command succeeded; for `run` that means every probe
/// passed.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            scenario,
            base_url,
            timeout,
            only,
            skip,
            config,
            json,
            report: report_path,
        } => {
            let config = match &config {
                Some(path) => Config::load_from(path)?,
                None => Config::load()?,
            };
            let config = resolve_config(
                config,
                RunOptions {
                    base_url,
                    timeout,
                    only,
                    skip,
                },
            )?;
            // Fatal before any probe runs
            let base_url = config.base_url()?;

            let mut scenario = load_scenario(scenario.as_deref())?;
            scenario.retain_categories(|c| config.categories.allows(c));

            let client = HttpClient::new(
                &base_url,
                Duration::from_secs(config.timeouts.request_secs),
            )?;

            let echo = if json { Echo::Stderr } else { Echo::Stdout };
            let header = format!(
                "{} {}\n{} {}",
                "Running Scenario:".blue().bold(),
                scenario.name.white().bold(),
                "Target:".blue(),
                base_url
            );
            if json {
                eprintln!("{}", header);
            } else {
                println!("{}", header);
            }

            let ledger = ScenarioRunner::new(client)
                .with_echo(echo)
                .run(&scenario.suites)
                .await;

            if json {
                println!("{}", report::to_json(&ledger)?);
            } else {
                print!("{}", report::format(&ledger));
            }
            if let Some(path) = report_path {
                write_report(&path, &ledger)?;
            }

            Ok(report::all_passed(&ledger))
        }

        Commands::List { scenario } => {
            let scenario = load_scenario(scenario.as_deref())?;

            println!("{}", scenario.name.bold());
            if let Some(desc) = &scenario.description {
                println!("  {}", desc.dimmed());
            }
            for suite in &scenario.suites {
                println!("\n{} ({})", suite.category.title().cyan(), suite.category);
                for probe in &suite.probes {
                    let mut line = format!("  {} {} {}", probe.name, probe.method, probe.path);
                    if let Some(identity) = &probe.identity {
                        line.push_str(&format!(" as {}", identity));
                    }
                    if let Some(login) = &probe.login {
                        match &login.role {
                            Some(role) => {
                                line.push_str(&format!(" [login {} ({})]", login.identity, role))
                            }
                            None => line.push_str(&format!(" [login {}]", login.identity)),
                        }
                    }
                    if let Some(identity) = &probe.logout {
                        line.push_str(&format!(" [logout {}]", identity));
                    }
                    println!("{}", line);
                }
            }
            Ok(true)
        }

        Commands::Check { scenario } => {
            let scenario = load_scenario(scenario.as_deref())?;
            println!(
                "{} {}: {} categories, {} probes",
                "✓".green(),
                scenario.name,
                scenario.suites.len(),
                scenario.probe_count()
            );
            Ok(true)
        }
    }
}

/// Apply command-line overrides on top of the loaded configuration
pub fn resolve_config(mut config: Config, opts: RunOptions) -> Result<Config> {
    if let Some(base_url) = opts.base_url {
        config.target.base_url = base_url;
    }
    if let Some(timeout) = opts.timeout {
        if timeout == 0 {
            return Err(Error::Config(
                "Timeout must be at least 1 second".to_string(),
            ));
        }
        config.timeouts.request_secs = timeout;
    }
    if !opts.only.is_empty() {
        config.categories.enabled = Some(opts.only);
    }
    config.categories.disabled.extend(opts.skip);
    config.categories.validate()?;
    Ok(config)
}

/// Write the JSON ledger to a file
pub fn write_report(path: &Path, ledger: &Ledger) -> Result<()> {
    std::fs::write(path, report::to_json(ledger)?).map_err(|e| Error::file_write(path, e))
}

/// Load a scenario file, or the bundled one when no path is given
pub fn load_scenario(path: Option<&Path>) -> Result<Scenario> {
    match path {
        Some(path) => Scenario::load(path),
        None => Scenario::bundled(),
    }
}
