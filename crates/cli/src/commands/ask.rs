use crate::exit_codes;
use crate::output::{self, render_table, OutputFormat};
use anyhow::Result;
use owo_colors::OwoColorize;
use switchblade_common::config::AppConfig;
use switchblade_common::models::Outcome;
use switchblade_core::{HistoryWrite, Pipeline, PipelineRun};

/// Run one question and return the process exit code.
pub async fn ask(
    config: &AppConfig,
    user_id: &str,
    question: &str,
    format: OutputFormat,
) -> Result<i32> {
    let pipeline = Pipeline::from_config(config).await?;

    if !format.is_machine_readable() {
        println!("{} {}", "?".cyan(), question.bold());
    }

    let run = pipeline.run_query(user_id, question).await;
    report(&run, format)
}

fn report(run: &PipelineRun, format: OutputFormat) -> Result<i32> {
    let exit_code = if run.outcome.is_completed() {
        exit_codes::SUCCESS
    } else {
        exit_codes::QUERY_ERROR
    };

    if format.is_machine_readable() {
        match &run.outcome {
            Outcome::Completed { .. } => output::print_success(format, run)?,
            Outcome::Error { message, .. } => {
                output::print_error_with(format, message, exit_code, run)?
            }
        }
        return Ok(exit_code);
    }

    match &run.outcome {
        Outcome::Completed {
            sql,
            explanation,
            results,
        } => {
            println!("{} {}", "✔".green(), "COMPLETED".green().bold());
            println!("{} {}", "SQL:".bold(), sql);
            if let Some(explanation) = explanation {
                println!("{}", explanation.dimmed());
            }
            println!();
            if results.columns().is_empty() {
                println!("{}", "(no result set)".dimmed());
            } else {
                println!("{}", render_table(results));
                println!("{}", format!("({} rows)", results.row_count()).dimmed());
            }
        }
        Outcome::Error { code, message } => {
            println!(
                "{} {} [{}] {}",
                "✖".red(),
                "ERROR".red().bold(),
                code,
                message
            );
        }
    }

    match &run.history {
        HistoryWrite::Recorded { message_id } => {
            println!("{}", format!("Recorded as {}", message_id).dimmed());
        }
        HistoryWrite::Skipped { reason } => {
            println!("{} History skipped: {}", "⚠".yellow(), reason);
        }
        HistoryWrite::Failed { error } => {
            eprintln!("{} History not recorded: {}", "⚠".yellow(), error);
        }
    }

    Ok(exit_code)
}
