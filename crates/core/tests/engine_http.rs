use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use switchblade_common::config::EngineSettings;
use switchblade_core::engine::{
    ExecutionState, HttpQueryEngine, PollBudget, QueryEngine, QueryEngineClient,
};
use switchblade_error::{ErrorCode, ErrorContext};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> EngineSettings {
    EngineSettings {
        endpoint: server.uri(),
        workgroup: "analysts".to_string(),
        results_bucket: "acme-results".to_string(),
        poll_interval_ms: 10,
        ..Default::default()
    }
}

fn client(server: &MockServer) -> QueryEngineClient {
    let settings = settings(server);
    let engine = HttpQueryEngine::new(&settings).unwrap();
    QueryEngineClient::from_settings(Arc::new(engine), &settings)
}

fn status_body(state: &str) -> serde_json::Value {
    json!({
        "QueryExecution": {
            "QueryExecutionId": "exec-42",
            "Status": { "State": state }
        }
    })
}

#[tokio::test]
async fn test_submit_posts_query_with_execution_context() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query-executions"))
        .and(body_partial_json(json!({
            "QueryString": "SELECT 1",
            "WorkGroup": "analysts",
            "ResultConfiguration": { "OutputLocation": "s3://acme-results/athena-results/" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "QueryExecutionId": "exec-42" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let execution = client(&server).submit("SELECT 1").await.unwrap();
    assert_eq!(execution.execution_id(), "exec-42");
    assert_eq!(execution.state(), ExecutionState::Submitted);
}

#[tokio::test]
async fn test_rejected_submission_is_execution_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query-executions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("line 1:8: syntax error"))
        .mount(&server)
        .await;

    let err = client(&server).submit("SELEC 1").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExecutionFailed);
    assert!(err.message.contains("syntax error"));
}

#[tokio::test]
async fn test_unreachable_engine_is_engine_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query-executions"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client(&server).submit("SELECT 1").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::EngineUnavailable);
    match err.context {
        Some(ErrorContext::Upstream { status, .. }) => assert_eq!(status, Some(502)),
        other => panic!("Unexpected context: {:?}", other),
    }
}

#[tokio::test]
async fn test_status_reports_failure_reason() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query-executions/exec-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "QueryExecution": {
                "QueryExecutionId": "exec-42",
                "Status": {
                    "State": "FAILED",
                    "StateChangeReason": "Query exceeded resource limits"
                }
            }
        })))
        .mount(&server)
        .await;

    let engine = HttpQueryEngine::new(&settings(&server)).unwrap();
    let status = engine.get_status("exec-42").await.unwrap();
    assert_eq!(status.state, ExecutionState::Failed);
    assert_eq!(
        status.state_change_reason.as_deref(),
        Some("Query exceeded resource limits")
    );
}

#[tokio::test]
async fn test_poll_times_out_while_engine_stays_running() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query-executions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "QueryExecutionId": "exec-42" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query-executions/exec-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("RUNNING")))
        .expect(5)
        .mount(&server)
        .await;

    let client = client(&server);
    let execution = client.submit("SELECT 1").await.unwrap();
    let err = client
        .poll_until_terminal(execution, PollBudget::attempts(5, Duration::from_millis(10)))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ExecutionTimedOut);
    match err.context {
        Some(ErrorContext::PollBudget {
            attempts,
            last_state,
            ..
        }) => {
            assert_eq!(attempts, 5);
            assert_eq!(last_state, "RUNNING");
        }
        other => panic!("Unexpected context: {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_follows_pagination_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query-executions/exec-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("SUCCEEDED")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/query-executions/exec-42/results"))
        .and(query_param("NextToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResultSet": { "Rows": [ { "Data": [ { "VarCharValue": "gadget" }, {} ] } ] }
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/query-executions/exec-42/results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResultSet": { "Rows": [
                { "Data": [ { "VarCharValue": "product" }, { "VarCharValue": "revenue" } ] },
                { "Data": [ { "VarCharValue": "widget" }, { "VarCharValue": "1200" } ] }
            ] },
            "NextToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let execution = switchblade_core::engine::QueryExecution::submitted("exec-42");
    let execution = client
        .poll_until_terminal(execution, PollBudget::attempts(3, Duration::from_millis(10)))
        .await
        .unwrap();
    assert_eq!(execution.state(), ExecutionState::Succeeded);

    let rows = client.fetch_results(&execution).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].data[0].var_char_value.as_deref(), Some("gadget"));
    assert!(rows[2].data[1].var_char_value.is_none());
}

#[tokio::test]
async fn test_fetch_before_success_never_calls_engine() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let execution = switchblade_core::engine::QueryExecution::submitted("exec-42");
    let err = client(&server).fetch_results(&execution).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_execution_id_is_escaped_in_paths() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/query-executions/exec%2F42%3Fx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("SUCCEEDED")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/query-executions/exec%2F42%3Fx/results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResultSet": { "Rows": [ { "Data": [ { "VarCharValue": "n" } ] } ] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let engine = HttpQueryEngine::new(&settings(&server)).unwrap();
    let status = engine.get_status("exec/42?x").await.unwrap();
    assert_eq!(status.state, ExecutionState::Succeeded);

    let page = engine.get_results("exec/42?x", None).await.unwrap();
    assert_eq!(page.rows.len(), 1);
}

#[tokio::test]
async fn test_endpoint_with_base_path_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/athena/query-executions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "QueryExecutionId": "exec-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let settings = EngineSettings {
        endpoint: format!("{}/athena/", server.uri()),
        ..settings(&server)
    };
    let engine = HttpQueryEngine::new(&settings).unwrap();
    let client = QueryEngineClient::from_settings(Arc::new(engine), &settings);
    let execution = client.submit("SELECT 1").await.unwrap();
    assert_eq!(execution.execution_id(), "exec-1");
}
