//! Structured exit codes for machine-readable error handling.
//!
//! Scripts can tell a failed question apart from a broken setup.

/// Success (standard convention)
pub const SUCCESS: i32 = 0;

/// General error (fallback for unknown errors)
pub const GENERAL_ERROR: i32 = 1;

/// CLI usage error (invalid arguments, blank user id)
pub const USAGE_ERROR: i32 = 2;

/// Configuration error (YAML parse failure, validation failure)
pub const CONFIG_ERROR: i32 = 3;

/// Connection error (translator, engine or history store unreachable)
pub const CONNECTION_ERROR: i32 = 4;

/// The pipeline ran and produced an ERROR outcome
pub const QUERY_ERROR: i32 = 5;
