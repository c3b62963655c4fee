use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use switchblade_common::config::AppConfig;
use switchblade_common::models::{HistoryRecord, HistoryStatus};
use switchblade_core::history::{HistoryRecorder, HistoryStore, SqliteHistoryStore};
use tracing::debug;

#[derive(Serialize)]
struct HistoryList {
    user_id: String,
    records: Vec<HistoryRecord>,
}

pub async fn history(
    config: &AppConfig,
    user_id: &str,
    limit: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let store = SqliteHistoryStore::new(PathBuf::from(&config.history.database_path))
        .context("Failed to open history store")?;
    store.init().await?;
    let recorder = HistoryRecorder::new(Arc::new(store));

    let limit = limit.unwrap_or(config.history.default_list_limit);
    let records = recorder.list(user_id, limit).await?;
    debug!(user_id, limit, count = records.len(), "Listed history");

    if format.is_machine_readable() {
        return output::print_success(
            format,
            HistoryList {
                user_id: user_id.to_string(),
                records,
            },
        );
    }

    if records.is_empty() {
        println!("No history for user '{}'.", user_id.bold());
        return Ok(());
    }

    println!(
        "{:<20} {:<10} {:<36} {}",
        "TIMESTAMP".bold(),
        "STATUS".bold(),
        "MESSAGE ID".bold(),
        "QUESTION".bold()
    );
    println!("{}", "-".repeat(90).dimmed());
    for record in records {
        let status = match record.status {
            HistoryStatus::Completed => record.status.as_str().green().to_string(),
            HistoryStatus::Error => record.status.as_str().red().to_string(),
        };
        println!(
            "{:<20} {:<10} {:<36} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            status,
            record.message_id,
            record.question
        );
        if let Some(detail) = &record.error_detail {
            println!("{:<20} {}", "", detail.dimmed());
        }
    }
    Ok(())
}
