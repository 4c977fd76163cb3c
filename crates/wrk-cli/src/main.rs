#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{Context, Exit};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wrk_core::ErrorCode;
use wrk_core::config::load_project_config;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "wrk: file-backed work-item queue",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Workspace root holding `.wrk/config.toml`. Defaults to the current directory.
    #[arg(long, global = true, value_name = "DIR")]
    workspace: Option<PathBuf>,

    /// Queue root override.
    #[arg(long, global = true, value_name = "DIR")]
    queue: Option<PathBuf>,

    /// Canonical state directory override.
    #[arg(long, global = true, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Check",
        about = "Validate canonical state files",
        after_help = "EXAMPLES:\n    # Check every ledger in the state directory\n    wrk validate\n\n    # Check one file\n    wrk validate .claude/state/state.yaml --json"
    )]
    Validate(cmd::validate::ValidateArgs),

    #[command(
        next_help_heading = "Check",
        about = "Verify process gate evidence for an item",
        after_help = "EXAMPLES:\n    wrk gates WRK-42\n    wrk gates WRK-42 --json"
    )]
    Gates(cmd::gates::GatesArgs),

    #[command(
        next_help_heading = "Check",
        about = "Audit the queue for stale or incomplete items"
    )]
    Scan(cmd::scan::ScanArgs),

    #[command(
        next_help_heading = "Repair",
        about = "Align item status with its directory",
        after_help = "EXAMPLES:\n    # Repair the whole queue\n    wrk reconcile\n\n    # Preview one item\n    wrk reconcile WRK-42 --dry-run"
    )]
    Reconcile(cmd::reconcile::ReconcileArgs),

    #[command(
        next_help_heading = "Repair",
        about = "Rewrite historical status synonyms to canonical values"
    )]
    Migrate(cmd::reconcile::MigrateArgs),

    #[command(
        next_help_heading = "Items",
        about = "Record the current session snapshot on an item",
        after_help = "EXAMPLES:\n    wrk session WRK-42 --notes \"parser done\" --file src/parse.rs --next \"add tests\""
    )]
    Session(cmd::session::SessionArgs),

    #[command(next_help_heading = "Items", about = "Show one work item")]
    Show(cmd::show::ShowArgs),

    #[command(next_help_heading = "Items", about = "Create a pending work item")]
    Create(cmd::create::CreateArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("WRK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "wrk=debug,info"
        } else {
            "wrk=info,warn"
        })
    });

    let format = env::var("WRK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn context(cli: &Cli, output: OutputMode) -> anyhow::Result<Result<Context, Exit>> {
    let workspace = match &cli.workspace {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };
    let config = match load_project_config(&workspace) {
        Ok(config) => config,
        Err(err) => {
            render_error(output, &CliError::from_code(err.code(), err.to_string()))?;
            return Ok(Err(Exit::for_error(err.code())));
        }
    };

    let queue_root = cli
        .queue
        .clone()
        .unwrap_or_else(|| config.queue_root(&workspace));
    let state_dir = cli
        .state_dir
        .clone()
        .unwrap_or_else(|| config.state_dir(&workspace));
    debug!(
        workspace = %workspace.display(),
        queue = %queue_root.display(),
        state = %state_dir.display(),
        "resolved workspace"
    );

    Ok(Ok(Context {
        workspace,
        config,
        queue_root,
        state_dir,
        output,
    }))
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<Exit> {
    let ctx = match context(cli, output)? {
        Ok(ctx) => ctx,
        Err(exit) => return Ok(exit),
    };

    match &cli.command {
        Commands::Validate(args) => cmd::validate::run_validate(args, &ctx),
        Commands::Gates(args) => cmd::gates::run_gates(args, &ctx),
        Commands::Scan(args) => cmd::scan::run_scan(args, &ctx),
        Commands::Reconcile(args) => cmd::reconcile::run_reconcile(args, &ctx),
        Commands::Migrate(args) => cmd::reconcile::run_migrate(args, &ctx),
        Commands::Session(args) => cmd::session::run_session(args, &ctx),
        Commands::Show(args) => cmd::show::run_show(args, &ctx),
        Commands::Create(args) => cmd::create::run_create(args, &ctx),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = cli.output_mode();

    match run(&cli, output) {
        Ok(exit) => exit.into(),
        Err(err) => {
            let error = CliError::from_code(ErrorCode::InternalUnexpected, format!("{err:#}"));
            if render_error(output, &error).is_err() {
                eprintln!("error: {err:#}");
            }
            Exit::Failure.into()
        }
    }
}
