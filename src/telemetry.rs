//! Structured logging setup.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Environment variable naming the deployment environment.
pub const ENVIRONMENT_VAR: &str = "TRACKSYNC_ENV";

/// Returns the default filter directive for `environment`.
///
/// Production logs at `info`; every other environment logs at `debug`.
#[must_use]
pub fn default_level(environment: &str) -> &'static str {
    if matches!(
        environment.trim().to_ascii_lowercase().as_str(),
        "prod" | "production"
    ) {
        "info"
    } else {
        "debug"
    }
}

/// Returns the deployment environment, `development` when unset.
#[must_use]
pub fn current_environment() -> String {
    std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_owned())
}

/// Installs the global fmt subscriber once per process.
///
/// `RUST_LOG` takes precedence over the environment default. An already
/// installed global subscriber is left in place.
pub fn init_logging(environment: &str) {
    LOGGING_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level(environment)));
        let installed = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
        if installed.is_err() {
            tracing::debug!("global tracing subscriber already installed");
        }
        tracing::info!(environment, "logging initialised");
    });
}
