//! The Ledger: the permission registry and the price resolver behind one
//! journaled write path.
//!
//! Every mutation takes the transaction lock, authorizes against live
//! registry state, appends the resulting record to the store and only then
//! commits it to the registry. A rejected write or a failed append leaves
//! both the registry and the journal as they were.

use std::num::NonZeroU8;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use keystone_core::{
    Address, CallContext, CurrencyId, DirectCaller, EventRecord, IdentityResolver,
    OwnershipTransferred, PermissionSet, PriceFeedAdded, ScopeId, TrustedForwarder,
};
use keystone_perms::{permission_ids, PermissionRegistry, PermissionsConfig, PermissionsData};
use keystone_prices::{FeedRef, PriceFeed, PriceResolver, ScopeAuthority};
use keystone_store::{EventStore, StoredEvent};

use crate::error::{LedgerError, Result};

/// Configuration for the Ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Controls default-scope price feeds.
    pub owner: Address,
    /// Relayer whose calls carry the original sender in their trailing bytes.
    #[serde(default)]
    pub trusted_forwarder: Option<Address>,
    /// Zero is the reserved id and is rejected on deserialization.
    #[serde(default = "default_root_permission_id")]
    pub root_permission_id: NonZeroU8,
}

fn default_root_permission_id() -> NonZeroU8 {
    permission_ids::ROOT_ID
}

impl LedgerConfig {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            trusted_forwarder: None,
            root_permission_id: permission_ids::ROOT_ID,
        }
    }

    pub fn with_trusted_forwarder(mut self, forwarder: Address) -> Self {
        self.trusted_forwarder = Some(forwarder);
        self
    }

    fn identity(&self) -> Arc<dyn IdentityResolver> {
        match self.trusted_forwarder {
            Some(forwarder) => Arc::new(TrustedForwarder::new(forwarder)),
            None => Arc::new(DirectCaller),
        }
    }
}

/// The main Ledger struct.
///
/// The registries are private: every change goes through the journaled
/// methods below, so there is no way to reach them directly.
///
/// ```compile_fail
/// use std::sync::Arc;
/// use keystone::{Address, Ledger, LedgerConfig};
/// use keystone::prices::ControllerDirectory;
/// use keystone::store::MemoryStore;
///
/// let ledger = Ledger::new(
///     LedgerConfig::new(Address::from_low_u64(1)),
///     Arc::new(ControllerDirectory::new()),
///     MemoryStore::new(),
/// );
/// let _ = ledger.permissions();
/// ```
pub struct Ledger<S: EventStore> {
    config: LedgerConfig,
    permissions: PermissionRegistry,
    prices: PriceResolver,
    store: Arc<S>,
    /// Serializes authorize, append, commit.
    tx: Mutex<()>,
}

impl<S: EventStore> Ledger<S> {
    /// Create a ledger with empty registries over `store`.
    ///
    /// Registries are not loaded from the store; call
    /// [`rebuild_permissions`](Self::rebuild_permissions) and
    /// [`rebuild_price_feeds`](Self::rebuild_price_feeds) for that.
    pub fn new(config: LedgerConfig, scope_authority: Arc<dyn ScopeAuthority>, store: S) -> Self {
        let identity = config.identity();
        let permissions = PermissionRegistry::new(
            PermissionsConfig {
                root_permission_id: config.root_permission_id,
            },
            identity.clone(),
        );
        let prices = PriceResolver::new(config.owner, identity, scope_authority);

        Self {
            config,
            permissions,
            prices,
            store: Arc::new(store),
            tx: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace an operator's permission set for `account` and journal it.
    pub async fn set_permissions_for(
        &self,
        ctx: &CallContext,
        account: Address,
        data: PermissionsData,
    ) -> Result<StoredEvent> {
        let _guard = self.tx.lock().await;

        let write = self.permissions.authorize_set(ctx, account, data)?;
        let stored = self
            .store
            .append(&EventRecord::PermissionsSet(write.record().clone()))
            .await?;
        self.permissions.commit(write)?;

        tracing::debug!(seq = stored.seq, id = %stored.id, "journaled permissions_set");
        Ok(stored)
    }

    /// Register a price feed and journal it.
    pub async fn add_price_feed_for(
        &self,
        ctx: &CallContext,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
        feed: FeedRef,
    ) -> Result<StoredEvent> {
        let _guard = self.tx.lock().await;

        let write = self
            .prices
            .authorize_add(ctx, scope, pricing_currency, unit_currency, feed)?;
        let stored = self
            .store
            .append(&EventRecord::PriceFeedAdded(write.record().clone()))
            .await?;
        self.prices.commit(write)?;

        tracing::debug!(seq = stored.seq, id = %stored.id, "journaled price_feed_added");
        Ok(stored)
    }

    /// Hand control of the default price scope to `new_owner` and journal it.
    pub async fn transfer_ownership(&self, ctx: &CallContext, new_owner: Address) -> Result<StoredEvent> {
        let _guard = self.tx.lock().await;

        let write = self.prices.authorize_transfer(ctx, new_owner)?;
        let stored = self
            .store
            .append(&EventRecord::OwnershipTransferred(write.record().clone()))
            .await?;
        self.prices.commit_transfer(write)?;

        tracing::debug!(seq = stored.seq, id = %stored.id, "journaled ownership_transferred");
        Ok(stored)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn permissions_of(&self, operator: Address, account: Address, scope: ScopeId) -> PermissionSet {
        self.permissions.permissions_of(operator, account, scope)
    }

    pub fn has_permission(
        &self,
        operator: Address,
        account: Address,
        scope: ScopeId,
        permission_id: u16,
        include_root: bool,
        include_wildcard_scope: bool,
    ) -> Result<bool> {
        Ok(self.permissions.has_permission(
            operator,
            account,
            scope,
            permission_id,
            include_root,
            include_wildcard_scope,
        )?)
    }

    pub fn has_all_permissions(
        &self,
        operator: Address,
        account: Address,
        scope: ScopeId,
        permission_ids: &[u16],
        include_root: bool,
        include_wildcard_scope: bool,
    ) -> Result<bool> {
        Ok(self.permissions.has_all_permissions(
            operator,
            account,
            scope,
            permission_ids,
            include_root,
            include_wildcard_scope,
        )?)
    }

    pub fn price_per_unit_of(
        &self,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
        decimals: u8,
    ) -> Result<u128> {
        Ok(self
            .prices
            .price_per_unit_of(scope, pricing_currency, unit_currency, decimals)?)
    }

    pub fn price_feed_for(
        &self,
        scope: ScopeId,
        pricing_currency: CurrencyId,
        unit_currency: CurrencyId,
    ) -> Option<FeedRef> {
        self.prices.feed_for(scope, pricing_currency, unit_currency)
    }

    /// Current owner of the default price scope.
    pub fn owner(&self) -> Address {
        self.prices.owner()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rebuild
    // ─────────────────────────────────────────────────────────────────────────

    /// Replay every journaled permission write. Returns the number applied.
    pub async fn rebuild_permissions(&self) -> Result<usize> {
        let _guard = self.tx.lock().await;
        let events = self.journal().await?;

        let mut applied = 0;
        for event in &events {
            if let EventRecord::PermissionsSet(record) = &event.record {
                self.permissions.apply_record(record);
                applied += 1;
            }
        }

        tracing::info!(applied, head = events.len(), "rebuilt permissions from journal");
        Ok(applied)
    }

    /// Replay every journaled feed registration and ownership transfer, in
    /// journal order. Returns the number of feeds applied.
    ///
    /// `resolve` maps a journaled feed address to the live feed. If any
    /// address cannot be resolved nothing is applied.
    pub async fn rebuild_price_feeds<F>(&self, resolve: F) -> Result<usize>
    where
        F: Fn(Address) -> Option<Arc<dyn PriceFeed>>,
    {
        let _guard = self.tx.lock().await;
        let events = self.journal().await?;

        let mut replay = Vec::new();
        for event in &events {
            match &event.record {
                EventRecord::PriceFeedAdded(record) => {
                    let feed = resolve(record.feed).ok_or(LedgerError::UnknownFeed(record.feed))?;
                    replay.push(Replay::Feed(record, feed));
                }
                EventRecord::OwnershipTransferred(record) => replay.push(Replay::Owner(record)),
                EventRecord::PermissionsSet(_) => {}
            }
        }

        let mut applied = 0;
        for step in replay {
            match step {
                Replay::Feed(record, feed) => {
                    self.prices.apply_record(record, feed)?;
                    applied += 1;
                }
                Replay::Owner(record) => self.prices.apply_ownership_record(record)?,
            }
        }

        tracing::info!(
            applied,
            head = events.len(),
            owner = %self.prices.owner(),
            "rebuilt price feeds from journal"
        );
        Ok(applied)
    }

    async fn journal(&self) -> Result<Vec<StoredEvent>> {
        let head = self.store.head_seq().await?;
        Ok(self.store.events_range(1, head).await?)
    }
}

enum Replay<'a> {
    Feed(&'a PriceFeedAdded, Arc<dyn PriceFeed>),
    Owner(&'a OwnershipTransferred),
}
