use crate::config::types::{Config, PolitenessConfig, StorageConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_politeness_config(&config.politeness)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates host throttle configuration
fn validate_politeness_config(config: &PolitenessConfig) -> Result<(), ConfigError> {
    if config.maximum_host_entries < 1 {
        return Err(ConfigError::Validation(format!(
            "maximum_host_entries must be >= 1, got {}",
            config.maximum_host_entries
        )));
    }

    if config.entry_expiry < config.delay {
        // Entries would expire before the delay runs out, so the delay is never enforced.
        tracing::warn!(
            "entry_expiry ({}ms) is shorter than the politeness delay ({}ms)",
            config.entry_expiry,
            config.delay
        );
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.location.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "storage location cannot be empty".to_string(),
        ));
    }

    Ok(())
}
