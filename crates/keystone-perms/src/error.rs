//! Error types for the permissions module.

use keystone_core::{Address, CoreError, ScopeId};
use thiserror::Error;

/// Errors that can occur during permission operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// A permission id outside `0..=255` was queried or assigned.
    #[error("permission id {0} is out of bounds")]
    PermissionIdOutOfBounds(u16),

    /// Permission id 0 appeared in a write.
    #[error("permission id 0 cannot be granted")]
    ZeroPermissionForbidden,

    /// The caller may not write this account's permissions.
    #[error("{caller} is not authorized to set permissions for {account} in scope {scope}")]
    Unauthorized {
        caller: Address,
        account: Address,
        scope: ScopeId,
    },

    /// Core error.
    #[error("core error: {0}")]
    CoreError(CoreError),
}

impl From<CoreError> for PermsError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::PermissionIdOutOfBounds(id) => PermsError::PermissionIdOutOfBounds(id),
            other => PermsError::CoreError(other),
        }
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
