use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub negotiation: NegotiationSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Retry knobs for the negotiation loop. The increment applied on each
/// surcharge rejection is always `installment_count * 100`; these settings
/// bound how long the loop may run.
#[derive(Clone, Debug)]
pub struct NegotiationSettings {
    pub discount_percent: f64,
    pub interval_step: i64,
    pub max_attempts: u32,
    pub attempt_timeout_secs: u64,
    pub overall_deadline_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub discount_percent: Option<f64>,
    pub max_attempts: Option<u32>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "https://sis.rus.com.ar/movil/rest".to_string(),
                timeout_secs: 30,
            },
            negotiation: NegotiationSettings {
                discount_percent: 0.0,
                interval_step: 300,
                max_attempts: 500,
                attempt_timeout_secs: 30,
                overall_deadline_secs: Some(600),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    service: Option<ServicePatch>,
    negotiation: Option<NegotiationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServicePatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NegotiationPatch {
    discount_percent: Option<f64>,
    interval_step: Option<i64>,
    max_attempts: Option<u32>,
    attempt_timeout_secs: Option<u64>,
    overall_deadline_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("rebill.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(service) = patch.service {
            if let Some(base_url) = service.base_url {
                self.service.base_url = base_url;
            }
            if let Some(timeout_secs) = service.timeout_secs {
                self.service.timeout_secs = timeout_secs;
            }
        }

        if let Some(negotiation) = patch.negotiation {
            if let Some(discount_percent) = negotiation.discount_percent {
                self.negotiation.discount_percent = discount_percent;
            }
            if let Some(interval_step) = negotiation.interval_step {
                self.negotiation.interval_step = interval_step;
            }
            if let Some(max_attempts) = negotiation.max_attempts {
                self.negotiation.max_attempts = max_attempts;
            }
            if let Some(attempt_timeout_secs) = negotiation.attempt_timeout_secs {
                self.negotiation.attempt_timeout_secs = attempt_timeout_secs;
            }
            if let Some(overall_deadline_secs) = negotiation.overall_deadline_secs {
                self.negotiation.overall_deadline_secs = Some(overall_deadline_secs);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("REBILL_BASE_URL") {
            self.service.base_url = value;
        }
        if let Some(value) = read_env("REBILL_TIMEOUT_SECS") {
            self.service.timeout_secs = parse_u64("REBILL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("REBILL_DISCOUNT_PERCENT") {
            self.negotiation.discount_percent = parse_f64("REBILL_DISCOUNT_PERCENT", &value)?;
        }
        if let Some(value) = read_env("REBILL_MAX_ATTEMPTS") {
            self.negotiation.max_attempts = parse_u32("REBILL_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = read_env("REBILL_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("REBILL_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.base_url {
            self.service.base_url = base_url;
        }
        if let Some(discount_percent) = overrides.discount_percent {
            self.negotiation.discount_percent = discount_percent;
        }
        if let Some(max_attempts) = overrides.max_attempts {
            self.negotiation.max_attempts = max_attempts;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("service.base_url must not be empty".into()));
        }
        if self.service.base_url.ends_with('/') {
            return Err(ConfigError::Validation(
                "service.base_url must not end with `/` (endpoint paths carry their own)".into(),
            ));
        }
        if self.negotiation.max_attempts == 0 {
            return Err(ConfigError::Validation("negotiation.max_attempts must be positive".into()));
        }
        if !(0.0..100.0).contains(&self.negotiation.discount_percent) {
            return Err(ConfigError::Validation(format!(
                "negotiation.discount_percent must be within [0, 100), got {}",
                self.negotiation.discount_percent
            )));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let fallback = PathBuf::from("rebill.toml");
    fallback.exists().then_some(fallback)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value: value.to_owned() })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value: value.to_owned() })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value: value.to_owned() })
}
