pub mod commands;

use clap::{Parser, Subcommand};
use lunchly_core::config::{AppConfig, LoadOptions, LogFormat};
use std::process::ExitCode;

use crate::commands::customers::CustomerCommand;

#[derive(Debug, Parser)]
#[command(
    name = "lunchly",
    about = "Lunchly reservation backend CLI",
    long_about = "Manage the Lunchly database: migrations, demo data, configuration inspection, and customer lookups.",
    after_help = "Examples:\n  lunchly migrate\n  lunchly customers search smith\n  lunchly customers top 3"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load and verify the deterministic demo customers and reservations")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Look up, search, rank, and add customers")]
    Customers {
        #[command(subcommand)]
        action: CustomerCommand,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Customers { action } => commands::customers::run(action),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the JSON payload.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded in tests.
    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
