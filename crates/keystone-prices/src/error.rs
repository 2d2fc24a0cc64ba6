//! Error types for price resolution.

use keystone_core::{Address, CurrencyId, ScopeId};
use thiserror::Error;

use crate::feed::FeedError;

/// Errors that can occur during price operations.
#[derive(Debug, Error)]
pub enum PriceError {
    /// The caller is neither the owner (default scope) nor the scope's controller.
    #[error("{caller} is not authorized to add price feeds for scope {scope}")]
    Unauthorized { caller: Address, scope: ScopeId },

    /// The caller is not the owner, or the proposed owner is the zero address.
    #[error("invalid owner: {0}")]
    InvalidOwner(Address),

    #[error("pricing currency cannot be zero")]
    ZeroPricingCurrency,

    #[error("unit currency cannot be zero")]
    ZeroUnitCurrency,

    /// A feed for the pair or its inverse is already registered.
    #[error("price feed already exists: {0}")]
    PriceFeedAlreadyExists(Address),

    /// No direct, inverse, or default-scope feed covers the pair.
    #[error("no price feed for {pricing_currency}/{unit_currency} in scope {scope}")]
    PriceFeedNotFound {
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
    },

    /// The feed itself failed.
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// An inverse lookup hit a feed reporting zero.
    #[error("feed {0} reported a zero price")]
    ZeroFeedPrice(Address),

    /// `10^decimals` does not fit in a u128.
    #[error("decimals {0} out of range")]
    DecimalsOutOfRange(u8),

    #[error("arithmetic overflow")]
    Overflow,
}

/// Result type for price operations.
pub type Result<T> = std::result::Result<T, PriceError>;
