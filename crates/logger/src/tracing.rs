use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Parse a format name; anything other than `json` is compact
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }

    /// Format from `RUST_LOG_FORMAT`, falling back to `fallback` when unset
    pub fn from_env_or(fallback: LogFormat) -> Self {
        match var("RUST_LOG_FORMAT") {
            Ok(name) => Self::from_name(&name),
            Err(_) => fallback,
        }
    }
}

/// Parse a level name, `None` when it is not one of the tracing levels
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

/// Initialize tracing at INFO, format taken from `RUST_LOG_FORMAT`.
pub fn init_tracing() {
    initialize_tracing(LevelFilter::INFO, LogFormat::from_env_or(LogFormat::Compact));
}

/// Initialize tracing from configured defaults.
///
/// `RUST_LOG` still overrides `level`, and `RUST_LOG_FORMAT` overrides
/// `format`. Calling this twice keeps the first subscriber.
pub fn init_with(level: &str, format: LogFormat) {
    let level = parse_level(level).unwrap_or(LevelFilter::INFO);
    initialize_tracing(level, LogFormat::from_env_or(format));
}

fn initialize_tracing(level: LevelFilter, format: LogFormat) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    if let Err(error) = tracing_subscriber::registry().with(log_layer).try_init() {
        warn!("Tracing already initialized: {error}");
    }
}
