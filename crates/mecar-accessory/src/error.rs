//! Error types for the accessory bridge

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up a vehicle accessory
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Accessory(#[from] mecar_core::AccessoryError),
}
