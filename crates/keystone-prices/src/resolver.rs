//! The price resolver.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use keystone_core::{
    Address, CallContext, CurrencyId, IdentityResolver, OwnershipTransferred, PriceFeedAdded,
    ScopeId,
};

use crate::authority::ScopeAuthority;
use crate::error::{PriceError, Result};
use crate::feed::{FeedRef, PriceFeed};
use crate::math::{mul_div, pow10};

/// Feeds registered at this scope are the protocol-wide fallback.
pub const DEFAULT_SCOPE: ScopeId = ScopeId(0);

/// A validated and authorized registration that has not been applied yet.
#[derive(Debug, Clone)]
#[must_use = "an authorized registration does nothing until committed"]
pub struct FeedWrite {
    record: PriceFeedAdded,
    feed: FeedRef,
}

impl FeedWrite {
    /// The record the registration will emit.
    pub fn record(&self) -> &PriceFeedAdded {
        &self.record
    }
}

/// An authorized ownership transfer that has not been applied yet.
#[derive(Debug, Clone)]
#[must_use = "an authorized transfer does nothing until committed"]
pub struct OwnershipWrite {
    record: OwnershipTransferred,
}

impl OwnershipWrite {
    /// The record the transfer will emit.
    pub fn record(&self) -> &OwnershipTransferred {
        &self.record
    }
}

type FeedKey = (ScopeId, CurrencyId, CurrencyId);

struct ResolverState {
    owner: Address,
    /// (scope, pricing, unit) -> feed. Entries are never replaced or removed.
    feeds: HashMap<FeedKey, FeedRef>,
}

impl ResolverState {
    fn get(&self, scope: ScopeId, pricing: CurrencyId, unit: CurrencyId) -> Option<&FeedRef> {
        self.feeds.get(&(scope, pricing, unit))
    }

    /// A feed covering the pair in either direction.
    fn covering(&self, scope: ScopeId, pricing: CurrencyId, unit: CurrencyId) -> Option<&FeedRef> {
        self.get(scope, pricing, unit)
            .or_else(|| self.get(scope, unit, pricing))
    }

    fn route(&self, scope: ScopeId, pricing: CurrencyId, unit: CurrencyId) -> Option<Route> {
        let mut scope = scope;
        loop {
            if let Some(feed) = self.get(scope, pricing, unit) {
                return Some(Route::Direct(feed.clone()));
            }
            if let Some(feed) = self.get(scope, unit, pricing) {
                return Some(Route::Inverse(feed.clone()));
            }
            if scope == DEFAULT_SCOPE {
                return None;
            }
            scope = DEFAULT_SCOPE;
        }
    }
}

enum Route {
    Direct(FeedRef),
    Inverse(FeedRef),
}

/// Registry of price feeds keyed by (scope, pricing currency, unit currency).
///
/// Thread-safe via RwLock. The route for a query is chosen from one
/// consistent snapshot; feeds are queried after the lock is released.
pub struct PriceResolver {
    identity: Arc<dyn IdentityResolver>,
    authority: Arc<dyn ScopeAuthority>,
    state: RwLock<ResolverState>,
}

impl PriceResolver {
    /// Create an empty resolver. `owner` controls the default scope.
    pub fn new(
        owner: Address,
        identity: Arc<dyn IdentityResolver>,
        authority: Arc<dyn ScopeAuthority>,
    ) -> Self {
        Self {
            identity,
            authority,
            state: RwLock::new(ResolverState {
                owner,
                feeds: HashMap::new(),
            }),
        }
    }

    /// The address allowed to register default-scope feeds.
    pub fn owner(&self) -> Address {
        self.read().owner
    }

    /// The feed registered at exactly this key, if any.
    pub fn feed_for(&self, scope: ScopeId, pricing: CurrencyId, unit: CurrencyId) -> Option<FeedRef> {
        self.read().get(scope, pricing, unit).cloned()
    }

    /// Price of one `unit_currency` in `pricing_currency`, scaled by `10^decimals`.
    pub fn price_per_unit_of(
        &self,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
        decimals: u8,
    ) -> Result<u128> {
        let one = pow10(decimals).ok_or(PriceError::DecimalsOutOfRange(decimals))?;
        if pricing_currency == unit_currency {
            return Ok(one);
        }

        let route = self.read().route(scope, pricing_currency, unit_currency);
        match route {
            Some(Route::Direct(feed)) => Ok(feed.current_unit_price(decimals)?),
            Some(Route::Inverse(feed)) => {
                let price = feed.current_unit_price(decimals)?;
                if price == 0 {
                    return Err(PriceError::ZeroFeedPrice(feed.id()));
                }
                mul_div(one, one, price).ok_or(PriceError::Overflow)
            }
            None => Err(PriceError::PriceFeedNotFound {
                scope,
                pricing_currency,
                unit_currency,
            }),
        }
    }

    /// Register `feed` for (`scope`, `pricing_currency`, `unit_currency`).
    ///
    /// Validation, authorization and the write happen under one write lock.
    pub fn add_price_feed_for(
        &self,
        ctx: &CallContext,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
        feed: FeedRef,
    ) -> Result<PriceFeedAdded> {
        let mut state = self.write();
        let write = self.authorize_in(&state, ctx, scope, pricing_currency, unit_currency, feed)?;
        Ok(insert(&mut state, write))
    }

    /// Validate and authorize a registration against live state without applying it.
    ///
    /// The caller is responsible for serializing `authorize_add` and
    /// [`commit`](Self::commit) against other writers.
    pub fn authorize_add(
        &self,
        ctx: &CallContext,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
        feed: FeedRef,
    ) -> Result<FeedWrite> {
        let state = self.read();
        self.authorize_in(&state, ctx, scope, pricing_currency, unit_currency, feed)
    }

    /// Apply a previously authorized registration.
    ///
    /// Authorization and conflicts are checked again against the state at
    /// commit time, so a write that raced another registration is rejected.
    pub fn commit(&self, write: FeedWrite) -> Result<PriceFeedAdded> {
        let mut state = self.write();
        let r = &write.record;
        self.check(&state, r.caller, r.scope, r.pricing_currency, r.unit_currency)?;
        Ok(insert(&mut state, write))
    }

    /// Replay a journaled registration without authorization.
    ///
    /// Replaying the record that is already in place is a no-op. A record
    /// that conflicts with a different registered feed is rejected.
    pub fn apply_record(&self, record: &PriceFeedAdded, feed: Arc<dyn PriceFeed>) -> Result<()> {
        let mut state = self.write();
        if let Some(existing) = state.get(record.scope, record.pricing_currency, record.unit_currency) {
            if existing.id() == record.feed {
                return Ok(());
            }
        }
        conflicts(&state, record.scope, record.pricing_currency, record.unit_currency)?;
        state.feeds.insert(
            (record.scope, record.pricing_currency, record.unit_currency),
            FeedRef::new(record.feed, feed),
        );
        Ok(())
    }

    /// Hand the default scope to `new_owner`. Returns the previous owner.
    pub fn transfer_ownership(&self, ctx: &CallContext, new_owner: Address) -> Result<Address> {
        let mut state = self.write();
        let write = self.authorize_transfer_in(&state, ctx, new_owner)?;
        Ok(transfer(&mut state, write).previous_owner)
    }

    /// Authorize an ownership transfer against live state without applying it.
    pub fn authorize_transfer(&self, ctx: &CallContext, new_owner: Address) -> Result<OwnershipWrite> {
        let state = self.read();
        self.authorize_transfer_in(&state, ctx, new_owner)
    }

    /// Apply a previously authorized transfer if its caller still owns the default scope.
    pub fn commit_transfer(&self, write: OwnershipWrite) -> Result<OwnershipTransferred> {
        let mut state = self.write();
        if write.record.caller != state.owner {
            return Err(PriceError::Unauthorized {
                caller: write.record.caller,
                scope: DEFAULT_SCOPE,
            });
        }
        Ok(transfer(&mut state, write))
    }

    /// Replay a journaled ownership transfer without authorization.
    pub fn apply_ownership_record(&self, record: &OwnershipTransferred) -> Result<()> {
        if record.new_owner.is_zero() {
            return Err(PriceError::InvalidOwner(record.new_owner));
        }
        self.write().owner = record.new_owner;
        Ok(())
    }

    fn authorize_transfer_in(
        &self,
        state: &ResolverState,
        ctx: &CallContext,
        new_owner: Address,
    ) -> Result<OwnershipWrite> {
        let caller = self.identity.effective_sender(ctx);
        if caller != state.owner {
            tracing::warn!(%caller, owner = %state.owner, "rejected ownership transfer");
            return Err(PriceError::Unauthorized {
                caller,
                scope: DEFAULT_SCOPE,
            });
        }
        if new_owner.is_zero() {
            return Err(PriceError::InvalidOwner(new_owner));
        }
        Ok(OwnershipWrite {
            record: OwnershipTransferred {
                previous_owner: state.owner,
                new_owner,
                caller,
            },
        })
    }

    fn authorize_in(
        &self,
        state: &ResolverState,
        ctx: &CallContext,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
        feed: FeedRef,
    ) -> Result<FeedWrite> {
        let caller = self.identity.effective_sender(ctx);
        self.check(state, caller, scope, pricing_currency, unit_currency)?;
        Ok(FeedWrite {
            record: PriceFeedAdded {
                scope,
                pricing_currency,
                unit_currency,
                feed: feed.id(),
                caller,
            },
            feed,
        })
    }

    fn check(
        &self,
        state: &ResolverState,
        caller: Address,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
    ) -> Result<()> {
        let authorized = if scope == DEFAULT_SCOPE {
            caller == state.owner
        } else {
            self.authority.is_controller_of(scope, &caller)
        };
        if !authorized {
            tracing::warn!(%caller, %scope, "rejected price feed registration");
            return Err(PriceError::Unauthorized { caller, scope });
        }

        if pricing_currency.is_zero() {
            return Err(PriceError::ZeroPricingCurrency);
        }
        if unit_currency.is_zero() {
            return Err(PriceError::ZeroUnitCurrency);
        }
        conflicts(state, scope, pricing_currency, unit_currency)
    }

    // Every write is a single insert or replace, so a poisoned state is never half-written.
    fn read(&self) -> RwLockReadGuard<'_, ResolverState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ResolverState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn conflicts(state: &ResolverState, scope: ScopeId, pricing: CurrencyId, unit: CurrencyId) -> Result<()> {
    // Default-scope feeds block every scope-level registration of the pair.
    if let Some(existing) = state.covering(DEFAULT_SCOPE, pricing, unit) {
        return Err(PriceError::PriceFeedAlreadyExists(existing.id()));
    }
    if let Some(existing) = state.covering(scope, pricing, unit) {
        return Err(PriceError::PriceFeedAlreadyExists(existing.id()));
    }
    Ok(())
}

fn transfer(state: &mut ResolverState, write: OwnershipWrite) -> OwnershipTransferred {
    let record = write.record;
    state.owner = record.new_owner;
    tracing::info!(
        previous = %record.previous_owner,
        new_owner = %record.new_owner,
        "price resolver ownership transferred"
    );
    record
}

fn insert(state: &mut ResolverState, write: FeedWrite) -> PriceFeedAdded {
    let record = write.record;
    state.feeds.insert(
        (record.scope, record.pricing_currency, record.unit_currency),
        write.feed,
    );
    tracing::debug!(
        scope = %record.scope,
        pricing = %record.pricing_currency,
        unit = %record.unit_currency,
        feed = %record.feed,
        "price feed added"
    );
    record
}
