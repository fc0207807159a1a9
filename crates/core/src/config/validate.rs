use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Store section exists (enforced by serde)
/// - Bucket and prefix are non-empty, prefix has no leading slash
/// - Worker parallelism and partition settings are coherent
/// - Probe command is non-empty when a probe is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Store validation
    if config.store.bucket.is_empty() {
        return Err(ConfigError::ValidationError(
            "store.bucket cannot be empty".to_string(),
        ));
    }
    if config.store.prefix.is_empty() {
        return Err(ConfigError::ValidationError(
            "store.prefix cannot be empty".to_string(),
        ));
    }
    if config.store.prefix.starts_with('/') {
        return Err(ConfigError::ValidationError(
            "store.prefix must not start with '/'".to_string(),
        ));
    }
    if config.store.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "store.retry.max_attempts must be at least 1".to_string(),
        ));
    }

    // Worker validation
    if config.worker.parallelism == 0 {
        return Err(ConfigError::ValidationError(
            "worker.parallelism must be at least 1".to_string(),
        ));
    }
    if config.worker.attempt_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "worker.attempt_timeout_secs must be at least 1".to_string(),
        ));
    }
    if config.worker.worker_count == 0 {
        return Err(ConfigError::ValidationError(
            "worker.worker_count must be at least 1".to_string(),
        ));
    }
    if config.worker.worker_index >= config.worker.worker_count {
        return Err(ConfigError::ValidationError(format!(
            "worker.worker_index {} out of range for worker_count {}",
            config.worker.worker_index, config.worker.worker_count
        )));
    }

    // Probe validation
    if let Some(probe) = &config.probe {
        if probe.command.is_empty() {
            return Err(ConfigError::ValidationError(
                "probe.command cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
