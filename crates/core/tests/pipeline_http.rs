use serde_json::json;
use switchblade_common::config::{
    AppConfig, EngineSettings, HistorySettings, TranslatorSettings,
};
use switchblade_common::models::{HistoryStatus, Outcome};
use switchblade_core::{HistoryWrite, Pipeline};
use switchblade_error::ErrorCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, history_dir: &tempfile::TempDir) -> AppConfig {
    AppConfig {
        translator: TranslatorSettings {
            endpoint: format!("{}/v1/convert", server.uri()),
            ..Default::default()
        },
        engine: EngineSettings {
            endpoint: server.uri(),
            poll_interval_ms: 10,
            max_poll_attempts: 5,
            ..Default::default()
        },
        history: HistorySettings {
            database_path: history_dir
                .path()
                .join("history.db")
                .to_string_lossy()
                .into_owned(),
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn mount_translator(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/convert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sql": "SELECT product, SUM(revenue) AS revenue FROM sales GROUP BY product"
        })))
        .mount(server)
        .await;
}

async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/query-executions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "QueryExecutionId": "exec-9" })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_question_to_table_end_to_end() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_translator(&server).await;
    mount_submit(&server).await;
    Mock::given(method("GET"))
        .and(path("/query-executions/exec-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueryExecution": { "QueryExecutionId": "exec-9", "Status": { "State": "SUCCEEDED" } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query-executions/exec-9/results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResultSet": { "Rows": [
                { "Data": [ { "VarCharValue": "product" }, { "VarCharValue": "revenue" } ] },
                { "Data": [ { "VarCharValue": "widget" }, { "VarCharValue": "1200" } ] },
                { "Data": [ { "VarCharValue": "gadget" }, {} ] }
            ] }
        })))
        .mount(&server)
        .await;

    let pipeline = Pipeline::from_config(&config(&server, &dir)).await.unwrap();
    let run = pipeline
        .run_query("analyst-1", "What was total revenue per product last quarter?")
        .await;

    match &run.outcome {
        Outcome::Completed { results, .. } => {
            assert_eq!(results.columns(), ["product".to_string(), "revenue".to_string()]);
            assert_eq!(results.rows()[1], vec![Some("gadget".to_string()), None]);
        }
        other => panic!("Expected COMPLETED, got {:?}", other),
    }

    let message_id = match run.history {
        HistoryWrite::Recorded { message_id } => message_id,
        other => panic!("Expected a recorded run, got {:?}", other),
    };
    let records = pipeline.recorder().list("analyst-1", 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message_id, message_id);
    assert_eq!(records[0].status, HistoryStatus::Completed);
}

#[tokio::test]
async fn test_timeout_end_to_end_writes_error_record() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    mount_translator(&server).await;
    mount_submit(&server).await;
    Mock::given(method("GET"))
        .and(path("/query-executions/exec-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueryExecution": { "QueryExecutionId": "exec-9", "Status": { "State": "RUNNING" } }
        })))
        .expect(5)
        .mount(&server)
        .await;

    let pipeline = Pipeline::from_config(&config(&server, &dir)).await.unwrap();
    let run = pipeline.run_query("analyst-1", "slow question").await;

    match &run.outcome {
        Outcome::Error { code, .. } => assert_eq!(*code, ErrorCode::ExecutionTimedOut),
        other => panic!("Expected ERROR, got {:?}", other),
    }

    let records = pipeline.recorder().list("analyst-1", 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, HistoryStatus::Error);
    assert!(records[0].error_detail.is_some());
}
