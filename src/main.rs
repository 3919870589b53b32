//! apiprobe - declarative HTTP API conformance testing
//!
//! Runs a scenario of HTTP probes against a server and exits 0 only when
//! every probe passed.

use apiprobe::common::logging;
use apiprobe::{cli, commands};
use clap::Parser;
use commands::Commands;

#[derive(Parser)]
#[command(name = "apiprobe", about = "Declarative HTTP API conformance tests")]
#[command(version, long_about = None)]
struct Cli {
    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
