//! Logging and tracing initialization.
//!
//! Logs always go to stderr; stdout carries the run summary or JSON report.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Level used when neither `RUST_LOG` nor the configured level parses.
const FALLBACK_LEVEL: &str = "info";

/// Initialize the tracing subscriber with the given configuration.
pub fn init_logging(config: &LoggingConfig) {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(from_env.as_deref(), &config.level);

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }

    if EnvFilter::try_new(&config.level).is_err() {
        tracing::warn!(level = %config.level, "Ignoring unparsable log level");
    }
}

/// `RUST_LOG` wins over the configured level.
fn build_filter(from_env: Option<&str>, configured: &str) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_LEVEL))
}
