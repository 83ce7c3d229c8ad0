//! Dirigent - directive execution CLI
//!
//! The `dirigent` command runs declarative directives against a project
//! directory inside the sandboxed runtime.
//!
//! ## Commands
//!
//! - `run`: execute a directive JSON file and print the execution result
//! - `validate`: check a directive file's shape without executing it
//! - `cache`: inspect or clear the runtime caches

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use dirigent_core::{executor, init_tracing, Directive, ExecutionMode, RuntimeConfigOverlay};

#[derive(Parser)]
#[command(name = "dirigent")]
#[command(author = "Dirigent Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sandboxed directive-execution runtime", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a directive file against a project directory
    Run {
        /// Path to the directive JSON file
        directive: PathBuf,

        /// Project directory the directive runs against
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Runtime configuration overlay (JSON file, merged over defaults)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Execution mode; only `directive` is handled by this binary
        #[arg(long, default_value = "directive")]
        mode: ExecutionMode,
    },

    /// Check a directive file's shape without executing it
    Validate {
        /// Path to the directive JSON file
        directive: PathBuf,
    },

    /// Inspect or clear the runtime caches
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry counts and hit/miss counters for both caches
    Stats,
    /// Drop all cached operation results and prompts
    Clear,
}

fn read_json(path: &PathBuf) -> Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Run {
            directive,
            project,
            config,
            mode,
        } => {
            if mode != ExecutionMode::Directive {
                bail!(
                    "execution mode '{mode}' is routed by the host system; \
                     this binary executes directives only"
                );
            }

            let value = read_json(&directive)?;
            let overlay = match config {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("cannot read {}", path.display()))?;
                    Some(
                        serde_json::from_str::<RuntimeConfigOverlay>(&raw).with_context(|| {
                            format!("{} is not a valid configuration overlay", path.display())
                        })?,
                    )
                }
                None => None,
            };

            let exec = executor(overlay);
            info!(
                directive = %directive.display(),
                project = %project.display(),
                "executing directive"
            );
            let result = exec.execute_directive(&value, &project).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Validate { directive } => {
            let value = read_json(&directive)?;
            match Directive::parse(&value) {
                Ok(Directive::Orchestration(d)) => {
                    println!(
                        "ok: orchestration directive '{}' with {} operation(s)",
                        d.tool,
                        d.operations.len()
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Ok(Directive::StateMachine(d)) => {
                    println!(
                        "ok: state machine with {} transition(s), final state '{}'",
                        d.transitions.len(),
                        d.final_state
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("invalid: {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Cache { action } => {
            let exec = executor(None);
            match action {
                CacheAction::Stats => {
                    println!("{}", serde_json::to_string_pretty(&exec.cache_stats())?);
                }
                CacheAction::Clear => {
                    exec.clear_caches();
                    info!("caches cleared");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
