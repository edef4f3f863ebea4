//! Process-level logging setup.
//!
//! Nothing here runs as an import side effect: the process entry point calls
//! [`init_logging`] exactly once with an explicit configuration. `RUST_LOG`
//! overrides the configured default filter.

use crate::config::LoggingConfig;
use crate::{Result, RolloutError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tracing::instrument(skip_all)]
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    cfg.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.filter.clone()));

    let result = if cfg.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    result.map_err(|e| RolloutError::InvalidConfig(format!("tracing already initialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialization_is_an_error() {
        // The global subscriber is process-wide, so both asserts live in one
        // test to keep ordering deterministic.
        assert!(init_logging(&LoggingConfig::default()).is_ok());
        assert!(init_logging(&LoggingConfig::default()).is_err());
    }

    #[test]
    fn empty_filter_is_rejected() {
        let cfg = LoggingConfig {
            filter: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            init_logging(&cfg),
            Err(RolloutError::InvalidConfig(_))
        ));
    }
}
