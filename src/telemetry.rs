//! Tracing subscriber setup

use crate::config::{LogFormat, MonitoringConfig};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over the configured
/// level. Returns false when logging is disabled or a subscriber is already
/// installed, so repeated calls are harmless.
pub fn init_tracing(config: &MonitoringConfig) -> bool {
    if !config.enable_logging {
        return false;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.log_format {
        LogFormat::Full => builder.try_init().is_ok(),
        LogFormat::Compact => builder.compact().try_init().is_ok(),
    }
}
