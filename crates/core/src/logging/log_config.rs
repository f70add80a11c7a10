use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::errors::{ElementsError, ElementsResult};
use crate::logging::log_level::{LogFormat, LogLevel};

/// Logging configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LogConfig {
    /// Minimum log level to display, unless `RUST_LOG` overrides it
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn from_observability(config: &ObservabilityConfig) -> ElementsResult<Self> {
        Ok(Self {
            level: config.log_level.parse()?,
            format: config.log_format.parse()?,
        })
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LogConfig) -> ElementsResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    result.map_err(|e| ElementsError::Configuration(format!("初始化日志失败: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_observability() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            log_format: "json".to_string(),
            metrics_enabled: false,
        };
        let log_config = LogConfig::from_observability(&config).unwrap();
        assert_eq!(log_config, LogConfig::with_level(LogLevel::Debug).with_format(LogFormat::Json));
    }

    #[test]
    fn test_from_observability_rejects_unknown_format() {
        let config = ObservabilityConfig {
            log_format: "xml".to_string(),
            ..ObservabilityConfig::default()
        };
        assert!(LogConfig::from_observability(&config).is_err());
    }
}
