//! Common building blocks shared across Switchblade crates.
//!
//! - **Configuration**: Strongly typed application configuration (`config`).
//! - **Data model**: Requests, result sets, outcomes and history records (`models`).
//! - **Logging**: Console and `errors.jsonl` subscriber setup (`logging`).
//! - **Telemetry**: Optional OTLP trace export (`telemetry`).
pub mod config;
pub mod logging;
pub mod models;
pub mod telemetry;
