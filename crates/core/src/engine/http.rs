//! JSON-over-HTTP query engine speaking the Athena request/response shapes.
use super::{ExecutionStatus, QueryEngine, RawRow, ResultPage, StartQueryRequest};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use switchblade_common::config::EngineSettings;
use switchblade_error::{ErrorCode, ErrorContext, Result, SwitchbladeError};

const SERVICE: &str = "query-engine";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryResponse {
    query_execution_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetExecutionResponse {
    query_execution: ExecutionDescription,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionDescription {
    status: ExecutionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetResultsResponse {
    #[serde(default)]
    result_set: ResultSetBody,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultSetBody {
    #[serde(default)]
    rows: Vec<RawRow>,
}

pub struct HttpQueryEngine {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

impl HttpQueryEngine {
    pub fn new(settings: &EngineSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build query engine HTTP client")?;
        let base_url = Url::parse(&settings.endpoint)
            .with_context(|| format!("Invalid query engine endpoint: {}", settings.endpoint))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Query engine endpoint cannot carry a path: {}", settings.endpoint);
        }
        Ok(Self {
            client,
            base_url,
            api_token: settings.api_token.clone(),
        })
    }

    /// `{endpoint}/query-executions[/{id}[/{suffix}]]`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SwitchbladeError::engine_unavailable(format!(
                    "Query engine endpoint cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("query-executions")
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) if !token.expose_secret().is_empty() => {
                builder.bearer_auth(token.expose_secret())
            }
            _ => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        operation: &str,
        client_error_code: ErrorCode,
    ) -> Result<T> {
        let resp = self.authorize(builder).send().await.map_err(|e| {
            SwitchbladeError::engine_unavailable(format!(
                "{} request to query engine failed: {}",
                operation, e
            ))
            .with_context(ErrorContext::Upstream {
                service: SERVICE.to_string(),
                status: None,
                body: None,
            })
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let code = if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                client_error_code
            } else {
                ErrorCode::EngineUnavailable
            };
            return Err(SwitchbladeError::new(
                code,
                format!("{} rejected by query engine: {} - {}", operation, status, body),
            )
            .with_context(ErrorContext::Upstream {
                service: SERVICE.to_string(),
                status: Some(status.as_u16()),
                body: Some(body),
            }));
        }

        resp.json::<T>().await.map_err(|e| {
            SwitchbladeError::engine_unavailable(format!(
                "Failed to decode {} response: {}",
                operation, e
            ))
        })
    }
}

#[async_trait]
impl QueryEngine for HttpQueryEngine {
    async fn start_query(&self, request: &StartQueryRequest) -> Result<String> {
        let url = self.url(&[])?;
        let resp: StartQueryResponse = self
            .send(
                self.client.post(url).json(request),
                "StartQueryExecution",
                ErrorCode::ExecutionFailed,
            )
            .await?;
        Ok(resp.query_execution_id)
    }

    async fn get_status(&self, execution_id: &str) -> Result<ExecutionStatus> {
        let url = self.url(&[execution_id])?;
        let resp: GetExecutionResponse = self
            .send(
                self.client.get(url),
                "GetQueryExecution",
                ErrorCode::EngineUnavailable,
            )
            .await?;
        Ok(resp.query_execution.status)
    }

    async fn get_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        let url = self.url(&[execution_id, "results"])?;
        let mut builder = self.client.get(url);
        if let Some(token) = next_token {
            builder = builder.query(&[("NextToken", token)]);
        }
        let resp: GetResultsResponse = self
            .send(builder, "GetQueryResults", ErrorCode::InvalidState)
            .await?;
        Ok(ResultPage {
            rows: resp.result_set.rows,
            next_token: resp.next_token.filter(|t| !t.is_empty()),
        })
    }
}
