//! A feed backed by an oracle aggregator.
//!
//! The aggregator publishes rounds carrying a signed answer at its own
//! precision and the time the round was last updated. The feed rejects
//! answers older than its staleness threshold and answers that are not
//! strictly positive, then rescales to the requested precision.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::feed::{FeedError, PriceFeed};
use crate::math::adjust_decimals;

/// The latest published round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    pub answer: i128,
    /// Unix seconds.
    pub updated_at: u64,
}

/// A source of oracle rounds.
pub trait Aggregator: Send + Sync {
    /// Precision of `answer`.
    fn decimals(&self) -> u8;

    fn latest_round(&self) -> Result<RoundData, FeedError>;
}

/// Source of the current time in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Price feed over an [`Aggregator`] with a staleness guard.
pub struct AggregatorFeed {
    source: Arc<dyn Aggregator>,
    staleness_threshold: u64,
    clock: Arc<dyn Clock>,
}

impl AggregatorFeed {
    /// Rounds older than `staleness_threshold` seconds are rejected.
    pub fn new(source: Arc<dyn Aggregator>, staleness_threshold: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            staleness_threshold,
            clock,
        }
    }

    /// Same as [`new`](Self::new) with the wall clock.
    pub fn with_system_clock(source: Arc<dyn Aggregator>, staleness_threshold: u64) -> Self {
        Self::new(source, staleness_threshold, Arc::new(SystemClock))
    }

    pub fn staleness_threshold(&self) -> u64 {
        self.staleness_threshold
    }
}

impl PriceFeed for AggregatorFeed {
    fn current_unit_price(&self, decimals: u8) -> Result<u128, FeedError> {
        let round = self.source.latest_round()?;
        let now = self.clock.now();

        if now > round.updated_at.saturating_add(self.staleness_threshold) {
            return Err(FeedError::StalePrice {
                updated_at: round.updated_at,
                now,
                threshold: self.staleness_threshold,
            });
        }
        if round.answer <= 0 {
            return Err(FeedError::NonPositivePrice(round.answer));
        }

        adjust_decimals(round.answer as u128, self.source.decimals(), decimals)
            .ok_or(FeedError::Overflow { decimals })
    }
}
