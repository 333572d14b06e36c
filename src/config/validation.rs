//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and addresses. All
//! problems are reported at once rather than stopping at the first.

use std::net::SocketAddr;

use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::config::schema::GateConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,

    #[error("timeouts.request_secs must be greater than zero when set")]
    ZeroTimeout,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    #[error("observability.log_level `{0}` is not one of off, error, warn, info, debug, trace")]
    LogLevel(String),
}

pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }

    if config.timeouts.request_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config
        .observability
        .log_level
        .parse::<LevelFilter>()
        .is_err()
    {
        errors.push(ValidationError::LogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
