//! # Keystone Prices
//!
//! Routes price queries to registered oracle feeds.
//!
//! ## Overview
//!
//! A feed is registered one-directionally under (scope, pricing currency,
//! unit currency) and reports how many units of the pricing currency one
//! unit of the unit currency costs, as a fixed-point integer scaled by
//! `10^decimals`.
//!
//! [`PriceResolver::price_per_unit_of`] resolves a query in order:
//!
//! 1. identical currencies price at exactly `10^decimals`
//! 2. a direct feed at the scope
//! 3. an inverse feed at the scope, inverted at full precision
//! 4. the same lookup at [`DEFAULT_SCOPE`]
//!
//! Registrations are write-once. A pair and its inverse are mutually
//! exclusive within a scope, and a pair covered at the default scope cannot
//! be registered at any other scope.
//!
//! ## Feeds
//!
//! - [`FixedPriceFeed`] - a constant price
//! - [`AggregatorFeed`] - an oracle round source guarded by a staleness threshold

pub mod aggregator;
pub mod authority;
pub mod error;
pub mod feed;
pub mod fixed;
pub mod math;
pub mod resolver;

pub use aggregator::{Aggregator, AggregatorFeed, Clock, RoundData, SystemClock};
pub use authority::{ControllerDirectory, ScopeAuthority};
pub use error::{PriceError, Result};
pub use feed::{FeedError, FeedRef, PriceFeed};
pub use fixed::FixedPriceFeed;
pub use resolver::{FeedWrite, PriceResolver, DEFAULT_SCOPE};
