//! Operator configuration, read once at startup from environment variables.

use crate::assets::TemplateSource;
use crate::util::errors::StdError;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::time::Duration;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_RECONCILE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ERROR_REQUEUE: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CONFLICT_REQUEUE: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = StdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(StdError::InvalidConfig(format!(
                "LOG_FORMAT must be `compact` or `json`, got `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Where the baseline nginx Deployment manifest is read from
    pub template: TemplateSource,
    /// Restrict watches to a single namespace; `None` watches all namespaces
    pub watch_namespace: Option<String>,
    /// Listen address of the health/metrics server
    pub bind_address: String,
    /// Deadline for a single reconcile pass
    pub reconcile_timeout: Duration,
    /// Requeue delay after a failed pass
    pub error_requeue: Duration,
    /// Requeue delay after an update conflict or a timed out pass
    pub conflict_requeue: Duration,
    /// Maximum parallel reconciles; 0 means unbounded
    pub max_concurrent_reconciles: u16,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template: TemplateSource::Embedded,
            watch_namespace: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            reconcile_timeout: DEFAULT_RECONCILE_TIMEOUT,
            error_requeue: DEFAULT_ERROR_REQUEUE,
            conflict_requeue: DEFAULT_CONFLICT_REQUEUE,
            max_concurrent_reconciles: 0,
            log_format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, StdError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StdError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let template = match get("NGINX_DEPLOYMENT_MANIFEST") {
            Some(path) => TemplateSource::File(PathBuf::from(path)),
            None => TemplateSource::Embedded,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(v) => v.parse()?,
            None => defaults.log_format,
        };

        Ok(Config {
            template,
            watch_namespace: get("WATCH_NAMESPACE"),
            bind_address: get("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            reconcile_timeout: seconds(get("RECONCILE_TIMEOUT_SECS"), "RECONCILE_TIMEOUT_SECS")?
                .unwrap_or(defaults.reconcile_timeout),
            error_requeue: seconds(get("ERROR_REQUEUE_SECS"), "ERROR_REQUEUE_SECS")?
                .unwrap_or(defaults.error_requeue),
            conflict_requeue: seconds(get("CONFLICT_REQUEUE_SECS"), "CONFLICT_REQUEUE_SECS")?
                .unwrap_or(defaults.conflict_requeue),
            max_concurrent_reconciles: parse(get("MAX_CONCURRENT_RECONCILES"), "MAX_CONCURRENT_RECONCILES")?
                .unwrap_or(defaults.max_concurrent_reconciles),
            log_format,
        })
    }
}

fn parse<T: FromStr>(value: Option<String>, key: &str) -> Result<Option<T>, StdError> {
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|_| StdError::InvalidConfig(format!("{key} must be a non-negative integer, got `{v}`")))
        })
        .transpose()
}

fn seconds(value: Option<String>, key: &str) -> Result<Option<Duration>, StdError> {
    match parse::<u64>(value, key)? {
        Some(0) => Err(StdError::InvalidConfig(format!("{key} must be greater than zero"))),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}
