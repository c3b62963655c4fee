//! Switchblade CLI: ask questions of your data from the terminal.
//!
//! # Commands
//!
//! - `ask`: Translate a question to SQL, run it and print the result table.
//! - `history`: Show what a user asked before and how each run ended.
//!
//! Configuration comes from `--config`, `SWITCHBLADE_CONFIG`,
//! `./config/switchblade.yaml` or `~/.switchblade/config.yaml`, overlaid by
//! `SWITCHBLADE__*` environment variables.

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use owo_colors::OwoColorize;

mod commands;
mod config;
mod exit_codes;
mod output;

use output::OutputFormat;
use switchblade_common::logging::{init_logging, LogSettings};
use switchblade_error::{ErrorCategory, SwitchbladeError};
use tracing::debug;

#[derive(Parser)]
#[command(name = "switchblade")]
#[command(about = "Ask natural-language questions of your data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human, json, yaml)
    #[arg(long, global = true, value_enum, default_value = "human")]
    output: OutputFormat,

    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Also write errors.jsonl into this directory
    #[arg(long, global = true, env = "SWITCHBLADE_LOG_DIR")]
    log_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a question through the pipeline
    Ask {
        /// User the run is recorded for
        #[arg(long, env = "SWITCHBLADE_USER")]
        user: String,
        /// The question, e.g. "total revenue per product last quarter"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List recorded runs of a user, newest first
    History {
        #[arg(long, env = "SWITCHBLADE_USER")]
        user: String,
        /// Maximum number of records (defaults to history.default_list_limit)
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let cli = Cli::parse();

    let exit_code = match run_cli(&cli).await {
        Ok(code) => code,
        Err(e) => {
            let exit_code = map_error_to_exit_code(&e);
            if cli.output.is_machine_readable() {
                output::print_error::<()>(cli.output, &format!("{:#}", e), exit_code).ok();
            } else {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            }
            exit_code
        }
    };

    switchblade_common::telemetry::shutdown_telemetry();
    if exit_code != exit_codes::SUCCESS {
        std::process::exit(exit_code);
    }
    Ok(())
}

fn map_error_to_exit_code(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<SwitchbladeError>() {
        return match err.code.category() {
            ErrorCategory::Input => exit_codes::USAGE_ERROR,
            ErrorCategory::Translation | ErrorCategory::Execution | ErrorCategory::History => {
                exit_codes::CONNECTION_ERROR
            }
            _ => exit_codes::GENERAL_ERROR,
        };
    }

    // Fallback: string heuristics for anyhow chains without a typed error
    let s = format!("{:#}", e).to_lowercase();
    if s.contains("config") || s.contains("yaml") {
        return exit_codes::CONFIG_ERROR;
    }
    if s.contains("connect") || s.contains("timeout") {
        return exit_codes::CONNECTION_ERROR;
    }
    exit_codes::GENERAL_ERROR
}

async fn run_cli(cli: &Cli) -> Result<i32, anyhow::Error> {
    let config_path = config::resolve_config_path(cli.config.as_deref());
    let config = config::load(&config_path)?;

    let mut log_settings = LogSettings::cli();
    if let Some(dir) = &cli.log_dir {
        log_settings = log_settings.with_log_dir(dir);
    }
    init_logging(&log_settings, &config.telemetry)?;
    debug!(
        path = %config_path.display(),
        found = config_path.exists(),
        "Resolved configuration file"
    );

    match &cli.command {
        Commands::Ask { user, question } => {
            let question = question.join(" ");
            commands::ask(&config, user, &question, cli.output).await
        }
        Commands::History { user, limit } => {
            commands::history(&config, user, *limit, cli.output).await?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_errors_map_by_category() {
        let err = anyhow::Error::new(SwitchbladeError::history_write_failed("disk full"))
            .context("Failed to open history store");
        assert_eq!(map_error_to_exit_code(&err), exit_codes::CONNECTION_ERROR);

        let err = anyhow::Error::new(SwitchbladeError::invalid_input("userId is required"));
        assert_eq!(map_error_to_exit_code(&err), exit_codes::USAGE_ERROR);
    }

    #[test]
    fn test_config_errors_map_to_config_exit_code() {
        let err = anyhow::anyhow!("Configuration validation failed: engine.max_poll_attempts");
        assert_eq!(map_error_to_exit_code(&err), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_question_words_are_joined() {
        let cli = Cli::try_parse_from([
            "switchblade",
            "--output",
            "json",
            "ask",
            "--user",
            "u-1",
            "revenue",
            "per",
            "product",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Ask { user, question } => {
                assert_eq!(user, "u-1");
                assert_eq!(question.join(" "), "revenue per product");
            }
            _ => panic!("expected ask"),
        }
    }
}
