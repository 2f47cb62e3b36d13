pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use rebill_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "rebill",
    about = "Renegotiate pending automatic-renewal proposals against the back office",
    after_help = "Examples:\n  rebill --code 1122 fetch\n  rebill --code 1122 --code 3344 negotiate\n  rebill config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a rebill.toml config file")]
    config: Option<PathBuf>,
    #[arg(
        long = "code",
        global = true,
        help = "Account code to operate on (repeatable)"
    )]
    codes: Vec<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Log in and list pending proposals per account code")]
    Fetch {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Fetch and renegotiate every pending proposal")]
    Negotiate {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with secrets redacted")]
    Config,
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: Default::default(),
    }) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            return ExitCode::from(1);
        }
    };
    init_logging(&config);

    let result = match cli.command {
        Command::Fetch { json } => commands::fetch::run(&config, &cli.codes, json),
        Command::Negotiate { json } => commands::negotiate::run(&config, &cli.codes, json),
        Command::Config => commands::config::run(&config),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
