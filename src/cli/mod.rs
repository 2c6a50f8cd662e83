use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::logging::HistoryLogger;

mod analyze;
mod check;

#[derive(Parser)]
#[command(
    name = "codescope",
    about = "Analyze, review and translate source code with a language model"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze code and review it for vulnerabilities
    Analyze {
        /// Source file (default: stdin)
        file: Option<PathBuf>,

        /// Also translate the code to this language
        #[arg(long)]
        translate: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Translate code to another language and print only the code
    Translate {
        /// Target language (see `codescope languages`)
        language: String,

        /// Source file (default: stdin)
        file: Option<PathBuf>,
    },
    /// Report whether the input looks like source code, without calling the model
    Check {
        /// Source file (default: stdin)
        file: Option<PathBuf>,
    },
    /// List the configured translation target languages
    Languages,
}

pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load();

    let source = match &cli.command {
        Commands::Analyze { file, .. }
        | Commands::Translate { file, .. }
        | Commands::Check { file } => read_source(file.as_deref())?,
        Commands::Languages => {
            check::languages(&config);
            return Ok(ExitCode::SUCCESS);
        }
    };

    let history = config
        .history
        .enabled
        .then(|| HistoryLogger::new(config.history_path(), config.history.max_size_mb));
    let history_ref = history.as_ref();

    let result = match cli.command {
        Commands::Analyze {
            translate, json, ..
        } => analyze::analyze(&config, &source, translate.as_deref(), json, history_ref).await,
        Commands::Translate { language, .. } => {
            analyze::translate(&config, &source, &language, history_ref).await
        }
        Commands::Check { .. } => Ok(check::check(&source, history_ref)),
        Commands::Languages => Ok(ExitCode::SUCCESS),
    };

    if let Some(history) = history {
        history.close().await;
    }

    result
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read stdin")?;
            Ok(source)
        }
    }
}

fn use_color() -> bool {
    std::io::stdout().is_terminal()
}
