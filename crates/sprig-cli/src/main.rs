#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use sprig_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sprig")]
#[command(author, version, about = "A minimal npm package manager", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Record a dependency declaration in package.json
    Add {
        /// Package spec: `name` or `name@rangeOrTag` (range defaults to "latest")
        spec: String,
    },

    /// Install the dependency tree into node_modules
    Install,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Exit contract: 0 for help/version, 1 for invalid usage
            match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    std::process::exit(0)
                }
                _ => std::process::exit(1),
            }
        }
    };

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Commands::Add { spec } => {
            let span = tracing::info_span!("add", cmd = "add", cwd = %config.cwd.display());
            let _guard = span.enter();
            commands::add::run(&spec, &config, cli.json)
        }
        Commands::Install => {
            let span = tracing::info_span!("install", cmd = "install", cwd = %config.cwd.display());
            let _guard = span.enter();
            commands::install::run(&config, cli.json)
        }
    }
}
