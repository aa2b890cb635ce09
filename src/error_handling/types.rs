//! Error types shared across subsystems.

use std::fmt;

/// Failures raised by the persistence gateway.
///
/// Persistence sits off the response path: callers on a hot path log these
/// and move on, only startup treats them as fatal.
#[derive(Debug)]
pub enum StoreError {
    ConnectionFailed(String),
    SchemaFailed(String),
    WriteFailed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ConnectionFailed(msg) => write!(f, "database connection failed: {}", msg),
            StoreError::SchemaFailed(msg) => write!(f, "schema initialization failed: {}", msg),
            StoreError::WriteFailed(msg) => write!(f, "database write failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        StoreError::WriteFailed(err.to_string())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidBindAddress(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBindAddress(addr) => write!(f, "invalid bind address: {}", addr),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level failures during startup and shutdown.
#[derive(Debug)]
pub enum ControllerError {
    Store(StoreError),
    Config(ConfigError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Store(err) => write!(f, "store: {}", err),
            ControllerError::Config(err) => write!(f, "config: {}", err),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<StoreError> for ControllerError {
    fn from(err: StoreError) -> Self {
        ControllerError::Store(err)
    }
}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::Config(err)
    }
}
