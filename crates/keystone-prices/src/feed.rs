//! The price feed capability.

use std::fmt;
use std::sync::Arc;

use keystone_core::Address;
use thiserror::Error;

/// Errors reported by a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The latest round is older than the feed tolerates.
    #[error("stale price: updated at {updated_at}, now {now}, threshold {threshold}s")]
    StalePrice { updated_at: u64, now: u64, threshold: u64 },

    /// The source reported zero or a negative answer.
    #[error("non-positive price: {0}")]
    NonPositivePrice(i128),

    /// The price cannot be represented at the requested precision.
    #[error("price overflows at {decimals} decimals")]
    Overflow { decimals: u8 },

    /// The source could not be read.
    #[error("feed unavailable: {0}")]
    Unavailable(String),
}

/// An oracle reporting a current unit price.
pub trait PriceFeed: Send + Sync {
    /// The current price scaled by `10^decimals`.
    fn current_unit_price(&self, decimals: u8) -> Result<u128, FeedError>;
}

/// A registered feed: its address plus the capability to query it.
///
/// The registry holds the reference; it does not own the feed.
#[derive(Clone)]
pub struct FeedRef {
    id: Address,
    feed: Arc<dyn PriceFeed>,
}

impl FeedRef {
    pub fn new(id: Address, feed: Arc<dyn PriceFeed>) -> Self {
        Self { id, feed }
    }

    /// The feed's address.
    pub fn id(&self) -> Address {
        self.id
    }

    /// Query the feed.
    pub fn current_unit_price(&self, decimals: u8) -> Result<u128, FeedError> {
        self.feed.current_unit_price(decimals)
    }
}

impl fmt::Debug for FeedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedRef({})", self.id)
    }
}
