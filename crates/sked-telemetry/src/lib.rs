use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output encoding for stdout logs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "sked_store" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            format: LogFormat::Pretty,
        }
    }
}

impl TelemetryConfig {
    /// Filter directives equivalent to this config, e.g. `info,sked_store=debug`.
    pub fn directives(&self) -> String {
        let mut filter_str = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter_str
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
    #[error("invalid module override {0:?}, expected `target=level`")]
    InvalidModuleLevel(String),
    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Parse a level name such as `info` or `DEBUG`.
pub fn parse_level(raw: &str) -> Result<Level, TelemetryError> {
    Level::from_str(raw.trim()).map_err(|_| TelemetryError::InvalidLevel(raw.to_string()))
}

/// Parse a per-module override such as `sked_store=debug`.
pub fn parse_module_level(raw: &str) -> Result<(String, Level), TelemetryError> {
    let (target, level) = raw
        .split_once('=')
        .filter(|(target, _)| !target.trim().is_empty())
        .ok_or_else(|| TelemetryError::InvalidModuleLevel(raw.to_string()))?;
    Ok((target.trim().to_string(), parse_level(level)?))
}

/// Initialize logging. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.directives()));

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives() {
        assert_eq!(TelemetryConfig::default().directives(), "info");
    }

    #[test]
    fn module_overrides_appended() {
        let config = TelemetryConfig {
            log_level: Level::WARN,
            module_levels: vec![
                ("sked_store".into(), Level::DEBUG),
                ("tower_http".into(), Level::TRACE),
            ],
            format: LogFormat::Json,
        };
        assert_eq!(config.directives(), "warn,sked_store=debug,tower_http=trace");
    }

    #[test]
    fn parse_level_accepts_any_case() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level(" INFO ").unwrap(), Level::INFO);
        assert!(matches!(parse_level("loud"), Err(TelemetryError::InvalidLevel(_))));
    }

    #[test]
    fn module_level_overrides_parse() {
        assert_eq!(
            parse_module_level("sked_store=debug").unwrap(),
            ("sked_store".to_string(), Level::DEBUG)
        );
        assert!(matches!(
            parse_module_level("sked_store"),
            Err(TelemetryError::InvalidModuleLevel(_))
        ));
        assert!(matches!(
            parse_module_level("=debug"),
            Err(TelemetryError::InvalidModuleLevel(_))
        ));
        assert!(matches!(
            parse_module_level("sked_store=loud"),
            Err(TelemetryError::InvalidLevel(_))
        ));
    }

    #[test]
    fn second_init_reports_error() {
        let config = TelemetryConfig::default();
        let _ = init_telemetry(&config);
        assert!(init_telemetry(&config).is_err());
    }
}
