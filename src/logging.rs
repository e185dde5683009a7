use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

use crate::config::LoggingConfig;

/// Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over
/// the configured level. Returns `false` when a subscriber was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.show_time {
        fmt::layer()
            .with_target(config.show_target)
            .with_thread_ids(false)
            .boxed()
    } else {
        fmt::layer()
            .with_target(config.show_target)
            .with_thread_ids(false)
            .without_time()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialisation_is_rejected_quietly() {
        let config = LoggingConfig {
            level: "not a valid ==== directive".into(),
            ..LoggingConfig::default()
        };
        let _ = init_logging(&config);
        assert!(!init_logging(&LoggingConfig::default()));
    }
}
