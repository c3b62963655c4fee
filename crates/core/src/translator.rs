//! Natural-language to SQL translation.
//!
//! One outbound call per question; nothing is cached because the upstream model
//! is not guaranteed to be deterministic.
use anyhow::Context;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use switchblade_common::config::TranslatorSettings;
use switchblade_common::models::GeneratedSql;
use switchblade_error::{ErrorContext, Result, SwitchbladeError};
use tracing::debug;

const SERVICE: &str = "translator";

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, question: &str) -> Result<GeneratedSql>;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TranslationContext {
    pub database: String,
    pub schema: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    question: &'a str,
    dialect: &'a str,
    context: &'a TranslationContext,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    sql: String,
    #[serde(default)]
    explanation: Option<String>,
}

/// HTTP client for the NL-to-SQL service.
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    dialect: String,
    context: TranslationContext,
}

impl HttpTranslator {
    pub fn new(settings: &TranslatorSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("Failed to build translator HTTP client")?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            dialect: settings.dialect.clone(),
            context: TranslationContext {
                database: settings.database.clone(),
                schema: settings.schema.clone(),
            },
        })
    }

    fn upstream(status: Option<u16>, body: Option<String>) -> ErrorContext {
        ErrorContext::Upstream {
            service: SERVICE.to_string(),
            status,
            body,
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, question: &str) -> Result<GeneratedSql> {
        if question.trim().is_empty() {
            return Err(SwitchbladeError::invalid_input(
                "Cannot translate an empty question",
            ));
        }

        let body = TranslateRequest {
            question,
            dialect: &self.dialect,
            context: &self.context,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.expose_secret().is_empty() {
            request = request.bearer_auth(self.api_key.expose_secret());
        }

        let resp = request.send().await.map_err(|e| {
            SwitchbladeError::translation_failed(format!("Translator request failed: {}", e))
                .with_context(Self::upstream(None, None))
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SwitchbladeError::translation_failed(format!(
                "Translator error: {} - {}",
                status, text
            ))
            .with_context(Self::upstream(Some(status.as_u16()), Some(text))));
        }

        let parsed = resp.json::<TranslateResponse>().await.map_err(|e| {
            SwitchbladeError::translation_failed(format!(
                "Failed to parse translator response: {}",
                e
            ))
            .with_context(Self::upstream(Some(status.as_u16()), None))
        })?;

        let sql = parsed.sql.trim();
        if sql.is_empty() {
            return Err(
                SwitchbladeError::translation_failed("Translator returned no SQL")
                    .with_context(Self::upstream(Some(status.as_u16()), None))
                    .with_hint("Rephrase the question with the table or metric you are after"),
            );
        }

        debug!(dialect = %self.dialect, sql = %sql, "Question translated");
        Ok(GeneratedSql {
            sql: sql.to_string(),
            explanation: parsed.explanation.filter(|e| !e.trim().is_empty()),
        })
    }
}
