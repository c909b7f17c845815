//! Logging setup.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{SimError, SimResult};

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install a console `tracing` subscriber filtered by `config.level`.
///
/// `RUST_LOG` takes precedence when set. Only the first successful call
/// installs a subscriber; later calls (or a subscriber installed by the host
/// application) leave the existing one in place.
pub fn init_tracing(config: &LoggingConfig) -> SimResult<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directive) if !directive.is_empty() => EnvFilter::try_new(directive),
        _ => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| SimError::Configuration(format!("invalid log filter: {e}")))?;

    INSTALLED.get_or_init(|| {
        if let Err(e) = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
        {
            tracing::debug!("keeping existing tracing subscriber: {e}");
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }

    #[test]
    fn test_invalid_directive() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "qstate_sim=verbose".to_string(),
        };
        assert!(matches!(
            init_tracing(&config),
            Err(SimError::Configuration(_))
        ));
    }
}
