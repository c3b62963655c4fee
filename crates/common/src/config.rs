use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use validator::Validate;

// Default constants
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SERVICE_NAME: &str = "switchblade";

pub const DEFAULT_TRANSLATOR_ENDPOINT: &str = "https://api.nova.ai/v1/convert";
pub const DEFAULT_DIALECT: &str = "athena";
pub const DEFAULT_DATABASE: &str = "default";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_ENGINE_ENDPOINT: &str = "http://localhost:9090";
pub const DEFAULT_WORKGROUP: &str = "primary";
pub const DEFAULT_RESULTS_BUCKET: &str = "switchblade-results";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;

pub const DEFAULT_HISTORY_PATH: &str = "data/history.db";
pub const DEFAULT_LIST_LIMIT: u32 = 50;

pub const DEFAULT_TELEMETRY_ENABLED: bool = false;
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

pub const ENV_PREFIX: &str = "SWITCHBLADE";

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerSettings,
    #[serde(default)]
    #[validate(nested)]
    pub translator: TranslatorSettings,
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineSettings,
    #[serde(default)]
    #[validate(nested)]
    pub history: HistorySettings,
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    #[validate(length(min = 1))]
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Settings for the natural-language-to-SQL service.
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct TranslatorSettings {
    #[serde(default = "default_translator_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    #[serde(default = "empty_secret")]
    pub api_key: SecretString,

    #[serde(default = "default_dialect")]
    #[validate(length(min = 1))]
    pub dialect: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            endpoint: default_translator_endpoint(),
            api_key: empty_secret(),
            dialect: default_dialect(),
            database: default_database(),
            schema: default_schema(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Settings for the asynchronous query engine.
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct EngineSettings {
    #[serde(default = "default_engine_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    /// Execution context queries are submitted to
    #[serde(default = "default_workgroup")]
    #[validate(length(min = 1))]
    pub workgroup: String,

    #[serde(default = "default_results_bucket")]
    pub results_bucket: String,

    /// Explicit output location; overrides the bucket-derived one
    #[serde(default)]
    pub output_location: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_poll_attempts")]
    #[validate(range(min = 1))]
    pub max_poll_attempts: u32,

    #[serde(default)]
    pub max_wait_secs: Option<u64>,

    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub api_token: Option<SecretString>,
}

impl EngineSettings {
    pub fn output_location(&self) -> String {
        self.output_location
            .clone()
            .unwrap_or_else(|| format!("s3://{}/athena-results/", self.results_bucket))
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            endpoint: default_engine_endpoint(),
            workgroup: default_workgroup(),
            results_bucket: default_results_bucket(),
            output_location: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            max_wait_secs: None,
            request_timeout_secs: default_request_timeout_secs(),
            api_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct HistorySettings {
    #[serde(default = "default_history_path")]
    #[validate(length(min = 1))]
    pub database_path: String,

    #[serde(default = "default_list_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub default_list_limit: u32,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            database_path: default_history_path(),
            default_list_limit: default_list_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_otlp_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_translator_endpoint() -> String {
    DEFAULT_TRANSLATOR_ENDPOINT.to_string()
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_dialect() -> String {
    DEFAULT_DIALECT.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_engine_endpoint() -> String {
    DEFAULT_ENGINE_ENDPOINT.to_string()
}

fn default_workgroup() -> String {
    DEFAULT_WORKGROUP.to_string()
}

fn default_results_bucket() -> String {
    DEFAULT_RESULTS_BUCKET.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_max_poll_attempts() -> u32 {
    DEFAULT_MAX_POLL_ATTEMPTS
}

fn default_history_path() -> String {
    DEFAULT_HISTORY_PATH.to_string()
}

fn default_list_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

fn default_telemetry_enabled() -> bool {
    DEFAULT_TELEMETRY_ENABLED
}

fn default_otlp_endpoint() -> String {
    DEFAULT_OTLP_ENDPOINT.to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

impl AppConfig {
    /// Load from an optional YAML file, then overlay environment variables.
    ///
    /// `SWITCHBLADE__ENGINE__WORKGROUP` maps to `engine.workgroup`, etc.
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;

        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_app_config_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.poll_interval_ms, 1000);
        assert_eq!(config.translator.dialect, "athena");
    }

    #[test]
    fn test_output_location_derived_from_bucket() {
        let settings = EngineSettings {
            results_bucket: "analytics-bucket".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.output_location(),
            "s3://analytics-bucket/athena-results/"
        );

        let explicit = EngineSettings {
            output_location: Some("s3://elsewhere/out/".to_string()),
            ..Default::default()
        };
        assert_eq!(explicit.output_location(), "s3://elsewhere/out/");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = TranslatorSettings {
            endpoint: "not_a_url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_attempts_rejected() {
        let config = EngineSettings {
            max_poll_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchblade.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
translator:
  endpoint: "https://nl2sql.internal/v1/convert"
  api_key: "sk-test"
engine:
  workgroup: "analysts"
  poll_interval_ms: 250
  max_poll_attempts: 20
history:
  database_path: "/var/lib/switchblade/history.db"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.translator.endpoint, "https://nl2sql.internal/v1/convert");
        assert_eq!(config.translator.api_key.expose_secret(), "sk-test");
        assert_eq!(config.engine.workgroup, "analysts");
        assert_eq!(config.engine.poll_interval_ms, 250);
        assert_eq!(config.engine.max_poll_attempts, 20);
        assert_eq!(
            config.history.database_path,
            "/var/lib/switchblade/history.db"
        );
        // Untouched sections keep their defaults
        assert_eq!(config.server.listen_addr, DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let settings = TranslatorSettings {
            api_key: SecretString::from("sk-very-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("sk-very-secret"));
    }
}
