//! Phase gate for agent workflows.
//!
//! `phasegate hook` is registered with the host for every lifecycle event and
//! decides allow (exit 0) or block (exit 2, reason on stderr). The remaining
//! subcommands inspect or reset the workflow from a terminal.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::warn;

use phasegate::core::types::ArtifactKind;
use phasegate::{cli, exit_codes, hook, logging};

#[derive(Parser)]
#[command(
    name = "phasegate",
    version,
    about = "Phase-gated workflow enforcement for agent hooks"
)]
struct Cli {
    /// Workflow root holding `.phasegate/`.
    #[arg(long, global = true, env = "CLAUDE_PROJECT_DIR", default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decide one hook event read from stdin.
    Hook,
    /// Show the workflow session.
    Status {
        /// Print the raw session as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Deactivate the workflow session.
    Reset,
    /// Create `.phasegate/config.toml` with defaults.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Print where a deliverable should be written today.
    Artifact {
        /// codebase-status, research, plan or review.
        kind: ArtifactKind,
        #[arg(long)]
        session: String,
    },
}

fn main() {
    logging::init();
    // clap exits 2 on usage errors, which the host reads as a block.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() {
                exit_codes::ERROR
            } else {
                exit_codes::ALLOW
            });
        }
    };
    if let Command::Hook = cli.command {
        std::process::exit(run_hook(&cli));
    }
    if let Err(err) = run(cli) {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::ERROR);
    }
}

fn run_hook(cli: &Cli) -> i32 {
    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        warn!(err = %err, "hook input unreadable, allowing");
        return exit_codes::ALLOW;
    }
    let output = hook::run_hook(&cli.root, &input, Local::now());
    if let Some(stdout) = output.stdout {
        println!("{stdout}");
    }
    if let Some(stderr) = output.stderr {
        eprintln!("{stderr}");
    }
    output.exit_code
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root;
    let text = match cli.command {
        Command::Hook => return Ok(()),
        Command::Status { json } => cli::status(&root, json),
        Command::Reset => cli::reset(&root),
        Command::Init { force } => cli::init(&root, force),
        Command::Artifact { kind, session } => {
            cli::artifact(&root, kind, &session, Local::now()).context("resolve artifact path")
        }
    }?;
    println!("{text}");
    Ok(())
}
