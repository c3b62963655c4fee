//! Query engine client: submit, poll to completion, fetch results.
//!
//! [`QueryEngine`] is the raw protocol seam (one call per remote operation).
//! [`QueryEngineClient`] layers the submission context, the poll loop and
//! result pagination on top of it.

pub mod http;
pub mod state;

pub use http::HttpQueryEngine;
pub use state::{next_state, ExecutionState, ExecutionStatus, PollBudget, QueryExecution};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use switchblade_common::config::EngineSettings;
use switchblade_error::{ErrorContext, Result, SwitchbladeError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result location for a submitted query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultConfiguration {
    pub output_location: String,
}

/// Body of a query submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartQueryRequest {
    pub query_string: String,
    pub work_group: String,
    pub result_configuration: ResultConfiguration,
}

/// One cell as delivered by the engine. A missing value is the engine's null marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_char_value: Option<String>,
}

impl RawCell {
    pub fn value(v: impl Into<String>) -> Self {
        Self {
            var_char_value: Some(v.into()),
        }
    }

    pub fn null() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRow {
    #[serde(default)]
    pub data: Vec<RawCell>,
}

impl RawRow {
    /// Row of non-null cells.
    pub fn of<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data: cells.into_iter().map(RawCell::value).collect(),
        }
    }
}

/// One page of results. The header row only appears on the first page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<RawRow>,
    pub next_token: Option<String>,
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Start asynchronous execution and return the engine's execution id.
    async fn start_query(&self, request: &StartQueryRequest) -> Result<String>;

    /// Read the current status of an execution. Read-only.
    async fn get_status(&self, execution_id: &str) -> Result<ExecutionStatus>;

    /// Read one page of results of a finished execution.
    async fn get_results(&self, execution_id: &str, next_token: Option<&str>)
        -> Result<ResultPage>;
}

pub struct QueryEngineClient {
    engine: Arc<dyn QueryEngine>,
    work_group: String,
    output_location: String,
}

impl QueryEngineClient {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        work_group: impl Into<String>,
        output_location: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            work_group: work_group.into(),
            output_location: output_location.into(),
        }
    }

    pub fn from_settings(engine: Arc<dyn QueryEngine>, settings: &EngineSettings) -> Self {
        Self::new(engine, settings.workgroup.clone(), settings.output_location())
    }

    /// Submit SQL for execution; returns as soon as the engine has accepted it.
    pub async fn submit(&self, sql: &str) -> Result<QueryExecution> {
        let request = StartQueryRequest {
            query_string: sql.to_string(),
            work_group: self.work_group.clone(),
            result_configuration: ResultConfiguration {
                output_location: self.output_location.clone(),
            },
        };
        let execution_id = self.engine.start_query(&request).await?;
        info!(
            execution_id = %execution_id,
            work_group = %self.work_group,
            "Query submitted"
        );
        Ok(QueryExecution::submitted(execution_id))
    }

    /// Poll at a fixed interval until the execution is terminal or the budget runs out.
    ///
    /// FAILED and CANCELLED are terminal and come back as `Ok`; use
    /// [`QueryExecution::ensure_succeeded`] to turn them into errors. Budget
    /// exhaustion is the only `ExecutionTimedOut` path.
    pub async fn poll_until_terminal(
        &self,
        mut execution: QueryExecution,
        budget: PollBudget,
    ) -> Result<QueryExecution> {
        if execution.state().is_terminal() {
            return Ok(execution);
        }

        let started = Instant::now();
        let mut attempts = 0u32;

        while attempts < budget.max_attempts {
            let status = self.engine.get_status(execution.execution_id()).await?;
            attempts += 1;

            let state = execution.observe(&status);
            debug!(
                execution_id = %execution.execution_id(),
                attempt = attempts,
                reported = %status.state,
                state = %state,
                "Polled execution"
            );

            if state.is_terminal() {
                info!(
                    execution_id = %execution.execution_id(),
                    state = %state,
                    attempts,
                    "Execution finished"
                );
                return Ok(execution);
            }

            if attempts >= budget.max_attempts {
                break;
            }
            if let Some(max_wait) = budget.max_wait {
                if started.elapsed() + budget.interval > max_wait {
                    break;
                }
            }
            tokio::time::sleep(budget.interval).await;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        warn!(
            execution_id = %execution.execution_id(),
            state = %execution.state(),
            attempts,
            elapsed_ms,
            "Poll budget exhausted"
        );
        Err(SwitchbladeError::execution_timed_out(format!(
            "Execution {} still {} after {} status checks ({} ms)",
            execution.execution_id(),
            execution.state(),
            attempts,
            elapsed_ms
        ))
        .with_context(ErrorContext::PollBudget {
            execution_id: execution.execution_id().to_string(),
            last_state: execution.state().to_string(),
            attempts,
            elapsed_ms,
        })
        .with_hint("Raise engine.max_poll_attempts or engine.max_wait_secs, or narrow the question"))
    }

    /// Fetch every result row, header first. Only valid once the execution SUCCEEDED.
    pub async fn fetch_results(&self, execution: &QueryExecution) -> Result<Vec<RawRow>> {
        if execution.state() != ExecutionState::Succeeded {
            return Err(SwitchbladeError::invalid_state(format!(
                "Cannot fetch results of execution {} in state {}",
                execution.execution_id(),
                execution.state()
            ))
            .with_context(ErrorContext::Execution {
                execution_id: execution.execution_id().to_string(),
                state: execution.state().to_string(),
                reason: execution.reason().map(str::to_string),
            }));
        }

        let mut rows = Vec::new();
        let mut next_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = self
                .engine
                .get_results(execution.execution_id(), next_token.as_deref())
                .await?;
            pages += 1;
            rows.extend(page.rows);

            match page.next_token {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    return Err(SwitchbladeError::engine_unavailable(format!(
                        "Engine returned continuation token '{}' twice for execution {}",
                        token,
                        execution.execution_id()
                    )));
                }
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(
            execution_id = %execution.execution_id(),
            pages,
            rows = rows.len(),
            "Fetched results"
        );
        Ok(rows)
    }
}
