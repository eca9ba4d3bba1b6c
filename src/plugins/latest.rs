//! The `latest` subsystem: converge a working copy onto a declared source
//! and revision, or preview the convergence without applying it.

use crate::core::config;
use crate::core::engine::{ConvergenceEngine, DesiredSpec, ReconcileResult};
use crate::core::error::TrunksyncError;
use crate::core::output;
use crate::core::runner::SvnRunner;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

const COMMENT_PREVIEW_LINES: usize = 20;
const COMMENT_PREVIEW_CHARS: usize = 200;

#[derive(Parser, Debug)]
#[clap(
    name = "latest",
    about = "Check out or update a working copy to the declared source and revision."
)]
pub struct LatestCli {
    /// Repository URL to converge the working copy onto.
    #[clap(long)]
    pub source: String,
    /// Directory holding (or receiving) the working copy.
    #[clap(long)]
    pub target: Option<PathBuf>,
    /// Pin to this revision instead of the repository head.
    #[clap(long)]
    pub rev: Option<String>,
    /// Local user to run the svn client as.
    #[clap(long)]
    pub user: Option<String>,
    /// Repository account used for authentication.
    #[clap(long)]
    pub username: Option<String>,
    /// Continue past conflicts and obstructing local files.
    #[clap(long)]
    pub force: bool,
    /// Skip checkout/update of nested externals.
    #[clap(long)]
    pub no_externals: bool,
    /// Report the would-be action without touching the working copy.
    #[clap(long)]
    pub dry_run: bool,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    pub format: String,
    /// Runner configuration file (defaults to ./.trunksync.json when present).
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Run one reconcile and render its result. The result is returned so the
/// caller can map `success` onto the process exit status.
pub fn run_latest_cli(cli: LatestCli) -> Result<ReconcileResult, TrunksyncError> {
    let cwd = std::env::current_dir()?;
    let cfg = config::load_config(cli.config.as_deref(), &cwd)?;
    let spec = DesiredSpec {
        source: cli.source,
        target: cli.target.unwrap_or_default(),
        rev: cli.rev,
        user: cli.user,
        username: cli.username,
        force: cli.force,
        externals: !cli.no_externals,
    };

    let runner = SvnRunner::new(cfg.clone());
    let engine = ConvergenceEngine::new(&runner).with_events_log(cfg.events_log.clone());
    let result = engine.reconcile(&spec, cli.dry_run);

    render_result(&result, &cli.format);
    Ok(result)
}

fn render_result(result: &ReconcileResult, format: &str) {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(result).unwrap());
        return;
    }

    let mark = if result.success {
        "✓".bright_green()
    } else {
        "✗".bright_red()
    };
    println!("{} {}", mark, result.name.bright_white());
    if !result.comment.is_empty() {
        println!(
            "{}",
            output::bounded_output(&result.comment, COMMENT_PREVIEW_LINES, COMMENT_PREVIEW_CHARS)
        );
    }
    if result.changes.is_empty() {
        println!("{}", "no changes".bright_black());
    } else {
        println!("{}", output::render_changes(&result.changes));
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "latest",
        "version": "0.1.0",
        "description": "Declarative convergence of an svn working copy to a source URL and revision",
        "commands": [
            {
                "name": "latest",
                "parameters": [
                    "source", "target", "rev", "user", "username",
                    "force", "no-externals", "dry-run", "format", "config"
                ]
            }
        ],
        "result": {
            "name": "string",
            "success": "bool",
            "comment": "string",
            "changes": "map<string,string>"
        },
        "storage": ["reconcile.events.jsonl (optional, via config)"]
    })
}
