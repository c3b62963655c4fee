//! One question in, one outcome out.
//!
//! Every stage failure is folded into an ERROR [`Outcome`] at a single exit
//! point, then the outcome is recorded before the run is returned. A failed
//! history write is reported next to the outcome and never replaces it.
use crate::engine::{HttpQueryEngine, PollBudget, QueryEngineClient};
use crate::history::{HistoryRecorder, HistoryStore, HistoryWrite, SqliteHistoryStore};
use crate::normalizer::normalize;
use crate::translator::{HttpTranslator, Translator};
use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use switchblade_common::config::AppConfig;
use switchblade_common::models::{Outcome, QueryRequest};
use switchblade_error::Result;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Everything a caller learns about one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub request_id: Uuid,
    pub outcome: Outcome,
    pub history: HistoryWrite,
}

pub struct Pipeline {
    translator: Arc<dyn Translator>,
    engine: QueryEngineClient,
    recorder: HistoryRecorder,
    budget: PollBudget,
}

impl Pipeline {
    pub fn new(
        translator: Arc<dyn Translator>,
        engine: QueryEngineClient,
        recorder: HistoryRecorder,
    ) -> Self {
        Self {
            translator,
            engine,
            recorder,
            budget: PollBudget::default(),
        }
    }

    pub fn with_budget(mut self, budget: PollBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Wire the HTTP collaborators and the SQLite store from configuration.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let translator = HttpTranslator::new(&config.translator)?;
        let engine = HttpQueryEngine::new(&config.engine)?;

        let store = SqliteHistoryStore::new(PathBuf::from(&config.history.database_path))
            .context("Failed to open history store")?;
        store
            .init()
            .await
            .context("Failed to initialize history store")?;

        let engine = QueryEngineClient::from_settings(Arc::new(engine), &config.engine);
        Ok(Self::new(
            Arc::new(translator),
            engine,
            HistoryRecorder::new(Arc::new(store)),
        )
        .with_budget(PollBudget::from_settings(&config.engine)))
    }

    pub fn recorder(&self) -> &HistoryRecorder {
        &self.recorder
    }

    pub fn budget(&self) -> PollBudget {
        self.budget
    }

    pub async fn run_query(&self, user_id: &str, question: &str) -> PipelineRun {
        self.run(QueryRequest::new(user_id, question)).await
    }

    #[tracing::instrument(name = "pipeline.run", skip(self, request), fields(request_id = %request.request_id()))]
    pub async fn run(&self, request: QueryRequest) -> PipelineRun {
        let outcome = match self.answer(&request).await {
            Ok(outcome) => {
                info!("Question answered");
                outcome
            }
            Err(e) => {
                warn!(target: "errors", code = %e.code, error = %e.message, "Pipeline run failed");
                Outcome::failed(&e)
            }
        };

        let history = match request.history_key() {
            None => HistoryWrite::Skipped {
                reason: "No userId supplied".to_string(),
            },
            Some(user_id) => match self
                .recorder
                .record(user_id, request.question(), &outcome)
                .await
            {
                Ok(record) => HistoryWrite::Recorded {
                    message_id: record.message_id,
                },
                Err(e) => {
                    let e = e.with_request_id(request.request_id().to_string());
                    error!(
                        target: "errors",
                        user_id = %user_id,
                        status = %outcome.status(),
                        error = %e,
                        "History write failed"
                    );
                    HistoryWrite::Failed { error: e }
                }
            },
        };

        PipelineRun {
            request_id: request.request_id(),
            outcome,
            history,
        }
    }

    async fn answer(&self, request: &QueryRequest) -> Result<Outcome> {
        request.validate()?;

        let generated = self.translator.translate(request.question()).await?;
        let execution = self.engine.submit(&generated.sql).await?;
        let execution = self.engine.poll_until_terminal(execution, self.budget).await?;
        execution.ensure_succeeded()?;

        let raw = self.engine.fetch_results(&execution).await?;
        let results = normalize(&raw)?;
        Ok(Outcome::completed(generated, results))
    }
}
