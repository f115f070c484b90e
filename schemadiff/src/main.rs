//! PostgreSQL schema comparison tool.
//!
//! Runs the bundled comparison engine once per object type and writes the
//! combined diff to stdout or a file.
//!
//! # Exit codes
//! - 0: every requested type was compared
//! - 1: configuration, engine or output failure
//! - 2: best-effort run stopped early; the partial report was written

use clap::Parser;
use schemadiff::{Cli, Command, RunOutcome, list_object_types, run_diff};
use schemadiff_core::{CancellationToken, Result, init_logging};
use tracing::{error, warn};

const PARTIAL_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(
        cli.global.verbose,
        cli.global.quiet,
        cli.global.log_format.into(),
    )?;

    match &cli.command {
        Some(Command::Types) => {
            println!("{}", list_object_types());
            Ok(())
        }
        None => {
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling comparison");
                    trigger.cancel();
                }
            });

            match run_diff(&cli.diff, &cancel).await {
                Ok(RunOutcome::Complete) => Ok(()),
                Ok(RunOutcome::Partial) => std::process::exit(PARTIAL_EXIT_CODE),
                Err(e) => {
                    error!("{}", e);
                    Err(e)
                }
            }
        }
    }
}
