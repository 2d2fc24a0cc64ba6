//! # Keystone
//!
//! The unified API over the permission registry, the price resolver and the
//! event journal.
//!
//! ## Overview
//!
//! - **Permissions**: accounts delegate scoped permission bit-sets to operators
//! - **Prices**: price queries are routed to registered oracle feeds, with
//!   inverse lookup and a protocol-wide default scope as fallback
//! - **Journal**: every accepted write is recorded as an event, and the
//!   registries can be rebuilt from it
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keystone::{Address, CallContext, CurrencyId, Ledger, LedgerConfig, ScopeId};
//! use keystone::perms::PermissionsData;
//! use keystone::prices::{ControllerDirectory, FeedRef, FixedPriceFeed, DEFAULT_SCOPE};
//! use keystone::store::SqliteStore;
//!
//! async fn example() -> keystone::Result<()> {
//!     let owner = Address::from_low_u64(1);
//!     let store = SqliteStore::open("keystone.db")?;
//!     let ledger = Ledger::new(LedgerConfig::new(owner), Arc::new(ControllerDirectory::new()), store);
//!
//!     let account = Address::from_low_u64(2);
//!     ledger
//!         .set_permissions_for(
//!             &CallContext::direct(account),
//!             account,
//!             PermissionsData::new(Address::from_low_u64(3), ScopeId(7), vec![4]),
//!         )
//!         .await?;
//!
//!     let feed = FeedRef::new(Address::from_low_u64(9), Arc::new(FixedPriceFeed::new(2000, 0)));
//!     ledger
//!         .add_price_feed_for(&CallContext::direct(owner), DEFAULT_SCOPE, CurrencyId(1), CurrencyId(2), feed)
//!         .await?;
//!
//!     let price = ledger.price_per_unit_of(ScopeId(7), CurrencyId(1), CurrencyId(2), 18)?;
//!     assert_eq!(price, 2000 * 10u128.pow(18));
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `keystone::core` - Addresses, scopes, permission sets, identity, events
//! - `keystone::perms` - The permission registry
//! - `keystone::prices` - The price resolver and feeds
//! - `keystone::store` - The event journal

pub mod error;
pub mod ledger;

pub use keystone_core as core;
pub use keystone_perms as perms;
pub use keystone_prices as prices;
pub use keystone_store as store;

pub use error::{LedgerError, Result};
pub use ledger::{Ledger, LedgerConfig};

pub use keystone_core::{
    Address, CallContext, CurrencyId, EventId, EventRecord, PermissionSet, ScopeId,
};
