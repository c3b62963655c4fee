//! Execution state machine for asynchronous query runs.
//!
//! The engine only ever reports a state; it never tells us what to do with it.
//! [`next_state`] is the single place where a reported state is folded into the
//! locally tracked one, so the rules below hold for every caller:
//!
//! - `SUBMITTED -> RUNNING -> {SUCCEEDED | FAILED | CANCELLED}`
//! - a terminal state absorbs every later report (no regression to RUNNING)
//! - a stale non-terminal report (RUNNING seen as QUEUED) is ignored

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use switchblade_common::config::EngineSettings;
use switchblade_error::{ErrorContext, Result, SwitchbladeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionState {
    /// Accepted by the engine, waiting for capacity.
    #[serde(alias = "QUEUED")]
    Submitted,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        match self {
            Self::Submitted => !matches!(target, Self::Submitted),
            Self::Running => target.is_terminal(),
            Self::Succeeded | Self::Failed | Self::Cancelled => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fold a reported state into the current one.
#[must_use]
pub fn next_state(current: ExecutionState, reported: ExecutionState) -> ExecutionState {
    if current.can_transition_to(reported) {
        reported
    } else {
        current
    }
}

/// Status as reported by one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutionStatus {
    pub state: ExecutionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_change_reason: Option<String>,
}

impl ExecutionStatus {
    pub fn new(state: ExecutionState) -> Self {
        Self {
            state,
            state_change_reason: None,
        }
    }

    pub fn with_reason(state: ExecutionState, reason: impl Into<String>) -> Self {
        Self {
            state,
            state_change_reason: Some(reason.into()),
        }
    }
}

/// Locally tracked view of one remote execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryExecution {
    execution_id: String,
    state: ExecutionState,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    reason: Option<String>,
}

impl QueryExecution {
    pub fn submitted(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: execution_id.into(),
            state: ExecutionState::Submitted,
            started_at: Utc::now(),
            completed_at: None,
            reason: None,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Engine-provided reason for the terminal state, if any.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Apply one poll response and return the resulting state.
    pub fn observe(&mut self, status: &ExecutionStatus) -> ExecutionState {
        let next = next_state(self.state, status.state);
        if next != self.state {
            if next.is_terminal() {
                self.completed_at = Some(Utc::now());
                self.reason = status.state_change_reason.clone();
            }
            self.state = next;
        }
        self.state
    }

    /// Turn a FAILED/CANCELLED/non-terminal execution into the matching error.
    pub fn ensure_succeeded(&self) -> Result<()> {
        let context = ErrorContext::Execution {
            execution_id: self.execution_id.clone(),
            state: self.state.to_string(),
            reason: self.reason.clone(),
        };
        match self.state {
            ExecutionState::Succeeded => Ok(()),
            ExecutionState::Failed => Err(SwitchbladeError::execution_failed(
                self.reason
                    .clone()
                    .unwrap_or_else(|| "Query execution failed".to_string()),
            )
            .with_context(context)),
            ExecutionState::Cancelled => Err(SwitchbladeError::new(
                switchblade_error::ErrorCode::ExecutionCancelled,
                self.reason
                    .clone()
                    .unwrap_or_else(|| "Query execution was cancelled".to_string()),
            )
            .with_context(context)),
            ExecutionState::Submitted | ExecutionState::Running => {
                Err(SwitchbladeError::invalid_state(format!(
                    "Execution {} has not finished (state {})",
                    self.execution_id, self.state
                ))
                .with_context(context))
            }
        }
    }
}

/// How long `poll_until_terminal` keeps asking before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBudget {
    pub interval: Duration,
    pub max_attempts: u32,
    pub max_wait: Option<Duration>,
}

impl PollBudget {
    pub fn attempts(max_attempts: u32, interval: Duration) -> Self {
        Self {
            interval,
            max_attempts,
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.poll_interval_ms),
            max_attempts: settings.max_poll_attempts,
            max_wait: settings.max_wait_secs.map(Duration::from_secs),
        }
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        Self::from_settings(&EngineSettings::default())
    }
}
