//! Trunksync: declarative convergence for Subversion working copies.
//!
//! Given a desired repository URL/revision and a local target path, trunksync
//! determines the minimal action needed to bring the path into compliance —
//! check out, update, or nothing — optionally previews that action without
//! applying it, and reports a structured, machine-consumable result.
//!
//! # Architecture
//!
//! - [`core::runner`]: the `CommandRunner` seam and the production svn client
//! - [`core::inspect`]: working-copy state inspection (`Present`/`Absent`)
//! - [`core::engine`]: the convergence decision procedure and result contract
//! - [`plugins::latest`]: the CLI surface over one reconcile
//!
//! Failure never escapes the core as a panic or process abort: every
//! reconcile terminates in a [`core::engine::ReconcileResult`], so callers
//! can batch many targets without one failure aborting the rest.
//!
//! # Example
//!
//! ```bash
//! # Preview what converging /srv/wc would do
//! trunksync latest --source http://example/repo/trunk --target /srv/wc --dry-run
//!
//! # Converge, pinned to a revision, tolerating local conflicts
//! trunksync latest --source http://example/repo/trunk --target /srv/wc \
//!     --rev 451 --force
//! ```

pub mod core;
pub mod plugins;

use crate::core::error::TrunksyncError;
use crate::plugins::latest;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[clap(
    name = "trunksync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Declarative convergence for Subversion working copies"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check out or update a working copy to the declared source and revision
    #[clap(name = "latest", visible_alias = "l")]
    Latest(latest::LatestCli),

    /// Machine-readable description of the reconcile surface
    #[clap(name = "schema")]
    Schema,
}

pub fn run() -> Result<ExitCode, TrunksyncError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Latest(latest_cli) => {
            let result = latest::run_latest_cli(latest_cli)?;
            // A failed reconcile is a normal result, not a process error;
            // the exit status is the only thing that reflects it.
            if result.success {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&latest::schema()).unwrap());
            Ok(ExitCode::SUCCESS)
        }
    }
}
