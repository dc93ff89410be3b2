use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_logging(default_level: &str, json: bool) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .is_ok()
}

pub fn init_from_config(config: &LoggingConfig, verbose: bool) -> bool {
    let level = if verbose { "debug" } else { config.level.as_str() };
    init_logging(level, config.json_format)
}
