//! A feed reporting a constant price.

use crate::feed::{FeedError, PriceFeed};
use crate::math::adjust_decimals;

/// Reports `price` (expressed at `decimals`) rescaled to any precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPriceFeed {
    price: u128,
    decimals: u8,
}

impl FixedPriceFeed {
    pub fn new(price: u128, decimals: u8) -> Self {
        Self { price, decimals }
    }
}

impl PriceFeed for FixedPriceFeed {
    fn current_unit_price(&self, decimals: u8) -> Result<u128, FeedError> {
        adjust_decimals(self.price, self.decimals, decimals).ok_or(FeedError::Overflow { decimals })
    }
}
