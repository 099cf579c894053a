use specter_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryInitError {
    #[error("failed to initialize env-filter logger: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Sets up the global tracing subscriber. The engine is mostly silent at
/// `info`: discoveries, warnings and errors only.
pub fn init(config: &LoggingConfig) -> Result<(), TelemetryInitError> {
    let filter = EnvFilter::try_new(config.env_filter_str())?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::PrettyCompact => registry
            .with(fmt::layer().compact().with_target(false))
            .init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }

    Ok(())
}
