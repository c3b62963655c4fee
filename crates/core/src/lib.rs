//! Switchblade Core: natural-language question to tabular answer.
//!
//! A run goes through five stages, each behind its own seam so that the
//! remote collaborators can be swapped for scripted ones in tests.
//!
//! ```text
//! question ──► Translator ──► QueryEngineClient ──► normalize ──► Outcome
//!                              submit / poll / fetch                  │
//!                                                                     ▼
//!                                                            HistoryRecorder
//! ```

pub mod engine;
pub mod history;
pub mod normalizer;
pub mod pipeline;
pub mod translator;

pub use engine::{PollBudget, QueryEngine, QueryEngineClient};
pub use history::{HistoryRecorder, HistoryStore, HistoryWrite};
pub use pipeline::{Pipeline, PipelineRun};
pub use translator::{HttpTranslator, Translator};
