//! Telemetry initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Configuration for the one console `fmt` layer + `EnvFilter` every
/// `engagement-*` binary bootstraps with.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub default_level: Option<String>,
    pub log_directives: Vec<String>,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the default log level (e.g., "debug", "info").
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = Some(level.into());
        self
    }

    /// Add a custom tracing directive (e.g., "my_crate=debug").
    pub fn with_log_directive(mut self, directive: impl Into<String>) -> Self {
        self.log_directives.push(directive.into());
        self
    }

    /// Loads `SERVICE_NAME` / `LOG_LEVEL` from the environment.
    pub fn from_env() -> Self {
        let service_name =
            std::env::var("SERVICE_NAME").unwrap_or_else(|_| "engagement-core".to_string());
        let default_level = std::env::var("LOG_LEVEL").ok();

        Self {
            service_name,
            default_level,
            log_directives: Vec::new(),
        }
    }
}

/// Initializes structured console logging once per process. Safe to call
/// more than once — only the first call takes effect.
pub fn init_telemetry(service_name: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_with_config(TelemetryConfig::new(service_name))
}

pub fn init_with_config(config: TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    INIT.call_once(|| {
        let mut filter = EnvFilter::try_from_default_env()
            .or_else(|_| {
                let level = config.default_level.as_deref().unwrap_or("info");
                EnvFilter::try_new(level)
            })
            .expect("failed to build env filter");

        for directive in &config.log_directives {
            filter = filter.add_directive(directive.parse().expect("invalid log directive"));
        }

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true);

        tracing_subscriber::registry().with(filter).with(fmt_layer).init();

        tracing::info!(
            service.name = config.service_name,
            log.level = config.default_level.as_deref().unwrap_or("env"),
            "telemetry initialized"
        );
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent_across_repeated_calls() {
        init_telemetry("test-service").unwrap();
        init_telemetry("test-service").unwrap();
    }
}
