use super::*;
use crate::exit_codes;
use crate::output::OutputFormat;
use std::sync::Arc;
use switchblade_common::config::{AppConfig, EngineSettings, HistorySettings, TranslatorSettings};
use switchblade_common::models::HistoryStatus;
use switchblade_core::history::{HistoryRecorder, HistoryStore, SqliteHistoryStore};

fn offline_config(dir: &tempfile::TempDir) -> AppConfig {
    AppConfig {
        // Nothing listens on the discard port, so every call is refused quickly.
        translator: TranslatorSettings {
            endpoint: "http://127.0.0.1:9/v1/convert".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        },
        engine: EngineSettings {
            endpoint: "http://127.0.0.1:9".to_string(),
            request_timeout_secs: 2,
            ..Default::default()
        },
        history: HistorySettings {
            database_path: dir.path().join("history.db").to_string_lossy().into_owned(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_ask_with_unreachable_translator_records_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir);

    let code = ask(&config, "cli-user", "revenue per product", OutputFormat::Json)
        .await
        .unwrap();
    assert_eq!(code, exit_codes::QUERY_ERROR);

    let store = SqliteHistoryStore::new(dir.path().join("history.db")).unwrap();
    store.init().await.unwrap();
    let records = HistoryRecorder::new(Arc::new(store))
        .list("cli-user", 10)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, HistoryStatus::Error);
}

#[tokio::test]
async fn test_history_on_fresh_store_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = offline_config(&dir);

    history(&config, "nobody", Some(5), OutputFormat::Json)
        .await
        .unwrap();
    history(&config, "nobody", None, OutputFormat::Human)
        .await
        .unwrap();
    assert!(dir.path().join("history.db").exists());
}
