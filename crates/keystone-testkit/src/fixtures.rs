//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use keystone::{Ledger, LedgerConfig, Result};
use keystone_core::{Address, CallContext, CurrencyId, ScopeId};
use keystone_perms::PermissionsData;
use keystone_prices::{ControllerDirectory, FeedRef, FixedPriceFeed, DEFAULT_SCOPE};
use keystone_store::{MemoryStore, StoredEvent};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A ledger over an in-memory journal, plus the addresses that control it.
pub struct TestFixture {
    pub owner: Address,
    pub directory: Arc<ControllerDirectory>,
    pub ledger: Ledger<MemoryStore>,
}

impl TestFixture {
    /// Create a fixture with a random owner.
    pub fn new() -> Self {
        Self::with_owner(random_address())
    }

    /// Create a fixture with a deterministic owner derived from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_owner(Address::from_bytes(rng.gen()))
    }

    pub fn with_owner(owner: Address) -> Self {
        let directory = Arc::new(ControllerDirectory::new());
        let ledger = Ledger::new(LedgerConfig::new(owner), directory.clone(), MemoryStore::new());
        Self {
            owner,
            directory,
            ledger,
        }
    }

    /// Assign a fresh random controller to `scope` and return it.
    pub fn controller_for(&self, scope: ScopeId) -> Address {
        let controller = random_address();
        self.directory.set_controller(scope, controller);
        controller
    }

    /// Have `account` grant `ids` to `operator` at `scope` itself.
    pub async fn grant(
        &self,
        account: Address,
        operator: Address,
        scope: ScopeId,
        ids: &[u16],
    ) -> Result<StoredEvent> {
        self.ledger
            .set_permissions_for(
                &CallContext::direct(account),
                account,
                PermissionsData::new(operator, scope, ids.to_vec()),
            )
            .await
    }

    /// Register a constant feed, acting as whoever controls `scope`.
    ///
    /// The default scope is written as the owner; any other scope gets a
    /// fresh controller.
    pub async fn register_fixed_feed(
        &self,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
        price: u128,
        decimals: u8,
    ) -> Result<FeedRef> {
        let caller = if scope == DEFAULT_SCOPE {
            self.ledger.owner()
        } else {
            self.controller_for(scope)
        };
        let feed = FeedRef::new(random_address(), Arc::new(FixedPriceFeed::new(price, decimals)));
        self.ledger
            .add_price_feed_for(
                &CallContext::direct(caller),
                scope,
                pricing_currency,
                unit_currency,
                feed.clone(),
            )
            .await?;
        Ok(feed)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A random non-zero address.
pub fn random_address() -> Address {
    let mut rng = rand::thread_rng();
    loop {
        let address = Address::from_bytes(rng.gen());
        if !address.is_zero() {
            return address;
        }
    }
}

/// `count` distinct random addresses.
pub fn random_addresses(count: usize) -> Vec<Address> {
    let mut out: Vec<Address> = Vec::with_capacity(count);
    while out.len() < count {
        let address = random_address();
        if !out.contains(&address) {
            out.push(address);
        }
    }
    out
}
