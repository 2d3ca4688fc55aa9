// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod commands;
mod helpers;

use clap::{error::ErrorKind, ArgAction, Parser, Subcommand};
use ens_clubs_core::{ExitCode, MachineError};
use ens_clubs_holders::{HoldersError, HoldersErrorKind};
use ens_clubs_store::StoreError;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

const ENS_CLUBS_HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
Usage: {usage}

Options:
{options}

Commands:
{subcommands}
{after-help}";

#[derive(Parser)]
#[command(name = "ens-clubs")]
#[command(version)]
#[command(about = "Resolve, snapshot and rank holders of ENS name clubs")]
#[command(help_template = ENS_CLUBS_HELP_TEMPLATE)]
#[command(
    after_help = "Environment:\n  ENS_CLUBS_ROOT         Data root holding categories/ and snapshots/\n  ENS_CLUBS_RPC_URL      JSON-RPC endpoint for the registrar contract\n  ENS_CLUBS_LOG_LEVEL    Log filter override (falls back to RUST_LOG)\n  ENS_CLUBS_LOG_JSON     Emit JSON log lines on stderr"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[arg(long, global = true, default_value_t = false)]
    quiet: bool,
    #[arg(long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Data root; overrides ENS_CLUBS_ROOT.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Snapshot day (YYYY-MM-DD); defaults to today in UTC.
    #[arg(long, global = true)]
    date: Option<String>,
    /// Labels resolved in flight per category.
    #[arg(long, global = true)]
    concurrency: Option<usize>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve owners for one category, or every category when omitted.
    Holders {
        category: Option<String>,
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        /// Only re-resolve these labels (comma separated) on top of today's snapshot.
        #[arg(long)]
        labels: Option<String>,
        /// Categories processed at once when walking.
        #[arg(long, default_value_t = 1)]
        parallel: usize,
    },
    /// Retry only the labels still unresolved in today's snapshot.
    FixHolders {
        category: Option<String>,
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        #[arg(long, default_value_t = 1)]
        parallel: usize,
    },
    /// Rank owners by label count and write the ranked view.
    SortHolders {
        category: Option<String>,
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
    /// Create a category from a file of names.
    Add { category: String, file: PathBuf },
    /// Print the effective configuration.
    Config,
}

#[derive(Clone, Copy)]
pub(crate) struct OutputMode {
    pub(crate) json: bool,
}

#[derive(Clone, Copy)]
struct LogFlags {
    quiet: bool,
    verbose: u8,
}

pub(crate) struct GlobalArgs {
    pub(crate) root: Option<PathBuf>,
    pub(crate) date: Option<String>,
    pub(crate) concurrency: Option<usize>,
}

pub fn main_entry() -> ProcessExitCode {
    let wants_json = std::env::args().any(|arg| arg == "--json");
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            emit_error(&err, wants_json);
            ProcessExitCode::from(err.exit_code as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => {
                return Err(CliError::usage("invalid command line arguments")
                    .with_detail("error", err.to_string().trim()));
            }
        },
    };
    helpers::init_tracing(LogFlags {
        quiet: cli.quiet,
        verbose: cli.verbose,
    });
    let output_mode = OutputMode { json: cli.json };
    let globals = GlobalArgs {
        root: cli.root,
        date: cli.date,
        concurrency: cli.concurrency,
    };
    let command = cli
        .command
        .ok_or_else(|| CliError::usage("missing command; see --help"))?;
    tracing::debug!(root = ?globals.root, date = ?globals.date, "cli.start");

    match command {
        Commands::Holders {
            category,
            exclude,
            labels,
            parallel,
        } => commands::run_holders(
            &globals,
            commands::HoldersArgs {
                category,
                exclude,
                labels,
                parallel,
            },
            output_mode,
        ),
        Commands::FixHolders {
            category,
            exclude,
            parallel,
        } => commands::run_fix_holders(&globals, category, &exclude, parallel, output_mode),
        Commands::SortHolders { category, exclude } => {
            commands::run_sort_holders(&globals, category, &exclude, output_mode)
        }
        Commands::Add { category, file } => {
            commands::run_add(&globals, &category, &file, output_mode)
        }
        Commands::Config => commands::run_config(&globals, output_mode),
    }
}

#[derive(Debug)]
pub(crate) struct CliError {
    exit_code: ExitCode,
    machine: MachineError,
}

impl CliError {
    pub(crate) fn usage(message: &str) -> Self {
        Self {
            exit_code: ExitCode::Usage,
            machine: MachineError::new("usage_error", message),
        }
    }

    pub(crate) fn internal(message: String) -> Self {
        Self {
            exit_code: ExitCode::Internal,
            machine: MachineError::new("internal_error", &message),
        }
    }

    pub(crate) fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.machine = self.machine.with_detail(key, value);
        self
    }
}

impl From<HoldersError> for CliError {
    fn from(err: HoldersError) -> Self {
        let exit_code = match err.kind {
            HoldersErrorKind::Input | HoldersErrorKind::Config => ExitCode::Validation,
            HoldersErrorKind::Persist => ExitCode::DependencyFailure,
            _ => ExitCode::Internal,
        };
        Self {
            exit_code,
            machine: MachineError::new(err.kind.as_str(), &err.message),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        HoldersError::from(err).into()
    }
}

fn emit_error(error: &CliError, machine_json: bool) {
    if machine_json {
        match error.machine.to_json() {
            Ok(payload) => eprintln!("{payload}"),
            Err(_) => eprintln!(
                "{{\"code\":\"internal_error\",\"message\":\"failed to encode structured error\",\"details\":{{}}}}"
            ),
        }
    } else {
        eprintln!("{}", error.machine.message);
        for (key, value) in &error.machine.details {
            eprintln!("  {key}: {value}");
        }
    }
}
