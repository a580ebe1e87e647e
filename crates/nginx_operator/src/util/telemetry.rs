use crate::util::config::LogFormat;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// Initialize tracing
pub async fn init(format: LogFormat) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Compact => {
            let logger = tracing_subscriber::fmt::layer().compact();
            let collector = Registry::default().with(logger).with(env_filter);
            tracing::subscriber::set_global_default(collector)
        }
        LogFormat::Json => {
            let logger = tracing_subscriber::fmt::layer().json();
            let collector = Registry::default().with(logger).with(env_filter);
            tracing::subscriber::set_global_default(collector)
        }
    }
}
