use std::path::Path;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

pub use config::ConfigError;

pub const ENV_PREFIX: &str = "AAROGYAM";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PortalConfig {
    /// Delay applied by the mocked backend before a portal submit completes.
    #[serde(default = "default_latency_ms")]
    pub simulated_latency_ms: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            simulated_latency_ms: default_latency_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_latency_ms() -> u64 {
    800
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `aarogyam=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub show_target: bool,
    #[serde(default = "true_default")]
    pub show_time: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            show_target: false,
            show_time: true,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn true_default() -> bool {
    true
}

impl PortalConfig {
    /// Built-in defaults, overridden by the optional YAML file at `path`, then
    /// by `AAROGYAM__*` environment variables
    /// (e.g. `AAROGYAM__LOGGING__LEVEL=debug`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = PortalConfig::load(Some(Path::new("does-not-exist.yaml")))
            .expect("defaults must load");
        assert_eq!(config.simulated_latency_ms, 800);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.show_time);
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!(
            "aarogyam-config-{}.yaml",
            std::process::id()
        ));
        {
            let mut file = std::fs::File::create(&path).expect("create config file");
            writeln!(file, "simulated_latency_ms: 0\nlogging:\n  level: debug")
                .expect("write config file");
        }

        let config = PortalConfig::load(Some(&path)).expect("config must load");
        std::fs::remove_file(&path).expect("remove config file");

        assert_eq!(config.simulated_latency_ms, 0);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.show_target);
    }
}
