//! Error types for Keystone Core.

use thiserror::Error;

/// Core errors that can occur while handling primitives and records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("permission id {0} is out of bounds (max 255)")]
    PermissionIdOutOfBounds(u16),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
