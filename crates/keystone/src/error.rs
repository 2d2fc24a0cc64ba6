//! Error types for the Ledger.

use keystone_core::{Address, CoreError};
use keystone_perms::PermsError;
use keystone_prices::PriceError;
use keystone_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Permission error.
    #[error("permission error: {0}")]
    Permission(#[from] PermsError),

    /// Price resolution error.
    #[error("price error: {0}")]
    Price(#[from] PriceError),

    /// Journal error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Encoding error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A journaled feed could not be resolved to a live feed during rebuild.
    #[error("no feed available for journaled address {0}")]
    UnknownFeed(Address),
}

/// Result type for Ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
