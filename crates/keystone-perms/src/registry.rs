//! The permission registry.
//!
//! Stores one [`PermissionSet`] per (operator, account, scope) and evaluates
//! queries against it. A key that was never written reads as the empty set.

use std::collections::HashMap;
use std::num::NonZeroU8;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use keystone_core::{
    Address, CallContext, IdentityResolver, PermissionSet, PermissionsSet, ScopeId,
};

use crate::check::PermissionCheck;
use crate::error::{PermsError, Result};
use crate::permission_ids::{RESERVED, ROOT_ID};

/// Permissions stored at this scope apply to every scope.
pub const WILDCARD_SCOPE: ScopeId = ScopeId(0);

/// Configuration for the permission registry.
#[derive(Debug, Clone)]
pub struct PermissionsConfig {
    /// The id that satisfies every other check. The reserved id 0 can never be ROOT.
    pub root_permission_id: NonZeroU8,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            root_permission_id: ROOT_ID,
        }
    }
}

/// The target of a permission write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionsData {
    pub operator: Address,
    pub scope: ScopeId,
    /// Raw ids; each must be in `1..=255`.
    pub permission_ids: Vec<u16>,
}

impl PermissionsData {
    pub fn new(operator: Address, scope: ScopeId, permission_ids: Vec<u16>) -> Self {
        Self {
            operator,
            scope,
            permission_ids,
        }
    }
}

/// A validated and authorized write that has not been applied yet.
#[derive(Debug, Clone)]
#[must_use = "an authorized write does nothing until committed"]
pub struct PermissionWrite {
    record: PermissionsSet,
}

impl PermissionWrite {
    /// The record the write will emit.
    pub fn record(&self) -> &PermissionsSet {
        &self.record
    }
}

type PermissionKey = (Address, Address, ScopeId);

#[derive(Debug, Default)]
struct PermissionTable {
    /// (operator, account, scope) -> packed permissions.
    sets: HashMap<PermissionKey, PermissionSet>,
}

impl PermissionTable {
    fn get(&self, operator: Address, account: Address, scope: ScopeId) -> PermissionSet {
        self.sets
            .get(&(operator, account, scope))
            .copied()
            .unwrap_or_default()
    }

    fn check(
        &self,
        operator: Address,
        account: Address,
        scope: ScopeId,
        include_root: bool,
        include_wildcard_scope: bool,
    ) -> PermissionCheck {
        PermissionCheck::new(
            self.get(operator, account, scope),
            self.get(operator, account, WILDCARD_SCOPE),
            include_root,
            include_wildcard_scope,
        )
    }

    fn insert(&mut self, record: &PermissionsSet) {
        self.sets
            .insert((record.operator, record.account, record.scope), record.packed);
    }
}

/// Registry of operator permissions.
///
/// Thread-safe via RwLock. Reads see either the state before or after any
/// write, never a partial one.
pub struct PermissionRegistry {
    root: u8,
    identity: Arc<dyn IdentityResolver>,
    table: RwLock<PermissionTable>,
}

impl PermissionRegistry {
    /// Create an empty registry.
    pub fn new(config: PermissionsConfig, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            root: config.root_permission_id.get(),
            identity,
            table: RwLock::new(PermissionTable::default()),
        }
    }

    /// The id treated as ROOT.
    pub fn root_permission_id(&self) -> u8 {
        self.root
    }

    /// The raw set stored for a key.
    pub fn permissions_of(&self, operator: Address, account: Address, scope: ScopeId) -> PermissionSet {
        self.read().get(operator, account, scope)
    }

    /// Whether `operator` holds `permission_id` for `account` in `scope`.
    pub fn has_permission(
        &self,
        operator: Address,
        account: Address,
        scope: ScopeId,
        permission_id: u16,
        include_root: bool,
        include_wildcard_scope: bool,
    ) -> Result<bool> {
        self.read()
            .check(operator, account, scope, include_root, include_wildcard_scope)
            .permits(self.root, permission_id)
    }

    /// Whether `operator` holds every id in `permission_ids`.
    pub fn has_all_permissions(
        &self,
        operator: Address,
        account: Address,
        scope: ScopeId,
        permission_ids: &[u16],
        include_root: bool,
        include_wildcard_scope: bool,
    ) -> Result<bool> {
        self.read()
            .check(operator, account, scope, include_root, include_wildcard_scope)
            .permits_all(self.root, permission_ids)
    }

    /// Replace the permission set for (`data.operator`, `account`, `data.scope`).
    ///
    /// Validation, authorization and the write happen under one write lock.
    pub fn set_permissions_for(
        &self,
        ctx: &CallContext,
        account: Address,
        data: PermissionsData,
    ) -> Result<PermissionsSet> {
        let mut table = self.write();
        let write = self.authorize_in(&table, ctx, account, data)?;
        table.insert(&write.record);
        tracing::debug!(
            operator = %write.record.operator,
            account = %write.record.account,
            scope = %write.record.scope,
            packed = %write.record.packed,
            "permissions set"
        );
        Ok(write.record)
    }

    /// Validate and authorize a write against live state without applying it.
    ///
    /// The caller is responsible for serializing `authorize_set` and
    /// [`commit`](Self::commit) against other writers.
    pub fn authorize_set(
        &self,
        ctx: &CallContext,
        account: Address,
        data: PermissionsData,
    ) -> Result<PermissionWrite> {
        let table = self.read();
        self.authorize_in(&table, ctx, account, data)
    }

    /// Apply a previously authorized write.
    ///
    /// The caller's authority is checked again against the table at commit
    /// time, so a write whose ROOT was revoked in between is rejected.
    pub fn commit(&self, write: PermissionWrite) -> Result<PermissionsSet> {
        let mut table = self.write();
        let r = &write.record;
        self.authorize_caller(&table, r.caller, r.account, r.scope, &r.packed)?;
        table.insert(&write.record);
        tracing::debug!(
            operator = %write.record.operator,
            account = %write.record.account,
            scope = %write.record.scope,
            "permissions committed"
        );
        Ok(write.record)
    }

    /// Replay a journaled record without authorization.
    pub fn apply_record(&self, record: &PermissionsSet) {
        self.write().insert(record);
    }

    fn authorize_in(
        &self,
        table: &PermissionTable,
        ctx: &CallContext,
        account: Address,
        data: PermissionsData,
    ) -> Result<PermissionWrite> {
        let (permission_ids, packed) = pack(&data.permission_ids)?;
        let caller = self.identity.effective_sender(ctx);
        self.authorize_caller(table, caller, account, data.scope, &packed)?;

        Ok(PermissionWrite {
            record: PermissionsSet {
                operator: data.operator,
                account,
                scope: data.scope,
                permission_ids,
                packed,
                caller,
            },
        })
    }

    /// An account may always write its own sets. Anyone else needs ROOT for
    /// the account at `scope`, may not grant ROOT and may not write the wildcard.
    fn authorize_caller(
        &self,
        table: &PermissionTable,
        caller: Address,
        account: Address,
        scope: ScopeId,
        packed: &PermissionSet,
    ) -> Result<()> {
        if caller == account {
            return Ok(());
        }
        let holds_root = table
            .check(caller, account, scope, true, true)
            .root_bypass(self.root);
        if !holds_root || packed.contains(self.root) || scope == WILDCARD_SCOPE {
            tracing::warn!(%caller, %account, %scope, holds_root, "rejected permission write");
            return Err(PermsError::Unauthorized {
                caller,
                account,
                scope,
            });
        }
        Ok(())
    }

    // Every write is a single insert, so a poisoned table is never half-written.
    fn read(&self) -> RwLockReadGuard<'_, PermissionTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PermissionTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Validate raw ids and pack them.
fn pack(raw: &[u16]) -> Result<(Vec<u8>, PermissionSet)> {
    let mut ids = Vec::with_capacity(raw.len());
    let mut packed = PermissionSet::EMPTY;
    for &id in raw {
        let id = PermissionSet::check_id(id)?;
        if id == RESERVED {
            return Err(PermsError::ZeroPermissionForbidden);
        }
        packed.insert(id);
        ids.push(id);
    }
    Ok((ids, packed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission_ids::ROOT;
    use keystone_core::{DirectCaller, TrustedForwarder};
    use proptest::prelude::*;

    const SCOPE: ScopeId = ScopeId(7);

    fn account() -> Address {
        Address::from_low_u64(1)
    }

    fn operator() -> Address {
        Address::from_low_u64(2)
    }

    fn stranger() -> Address {
        Address::from_low_u64(3)
    }

    fn registry() -> PermissionRegistry {
        PermissionRegistry::new(PermissionsConfig::default(), Arc::new(DirectCaller))
    }

    fn grant(registry: &PermissionRegistry, operator: Address, scope: ScopeId, ids: &[u16]) {
        registry
            .set_permissions_for(
                &CallContext::direct(account()),
                account(),
                PermissionsData::new(operator, scope, ids.to_vec()),
            )
            .unwrap();
    }

    #[test]
    fn test_unwritten_key_is_empty() {
        let registry = registry();
        assert!(registry.permissions_of(operator(), account(), SCOPE).is_empty());
        assert!(!registry
            .has_permission(operator(), account(), SCOPE, 5, true, true)
            .unwrap());
    }

    #[test]
    fn test_self_service_grant_and_query() {
        let registry = registry();
        grant(&registry, operator(), SCOPE, &[5, 6]);

        assert!(registry.has_permission(operator(), account(), SCOPE, 5, false, false).unwrap());
        assert!(registry.has_all_permissions(operator(), account(), SCOPE, &[5, 6], false, false).unwrap());
        assert!(!registry.has_permission(operator(), account(), ScopeId(8), 5, false, false).unwrap());
    }

    #[test]
    fn test_write_replaces_not_merges() {
        let registry = registry();
        grant(&registry, operator(), SCOPE, &[5, 6]);
        grant(&registry, operator(), SCOPE, &[7]);

        assert!(!registry.has_permission(operator(), account(), SCOPE, 5, false, false).unwrap());
        assert!(registry.has_permission(operator(), account(), SCOPE, 7, false, false).unwrap());

        grant(&registry, operator(), SCOPE, &[]);
        assert!(registry.permissions_of(operator(), account(), SCOPE).is_empty());
    }

    #[test]
    fn test_zero_id_rejected_state_unchanged() {
        let registry = registry();
        grant(&registry, operator(), SCOPE, &[5]);

        let err = registry
            .set_permissions_for(
                &CallContext::direct(account()),
                account(),
                PermissionsData::new(operator(), SCOPE, vec![9, 0]),
            )
            .unwrap_err();
        assert!(matches!(err, PermsError::ZeroPermissionForbidden));
        assert_eq!(
            registry.permissions_of(operator(), account(), SCOPE),
            PermissionSet::from_ids(&[5]).unwrap()
        );
    }

    #[test]
    fn test_out_of_bounds_on_both_paths() {
        let registry = registry();
        let err = registry
            .set_permissions_for(
                &CallContext::direct(account()),
                account(),
                PermissionsData::new(operator(), SCOPE, vec![256]),
            )
            .unwrap_err();
        assert!(matches!(err, PermsError::PermissionIdOutOfBounds(256)));

        let err = registry
            .has_permission(operator(), account(), SCOPE, 300, true, true)
            .unwrap_err();
        assert!(matches!(err, PermsError::PermissionIdOutOfBounds(300)));
    }

    #[test]
    fn test_root_holder_passes_any_id() {
        let registry = registry();
        grant(&registry, operator(), SCOPE, &[ROOT as u16]);

        assert!(registry.has_permission(operator(), account(), SCOPE, 200, true, false).unwrap());
        assert!(!registry.has_permission(operator(), account(), SCOPE, 200, false, false).unwrap());
        assert!(registry
            .has_all_permissions(operator(), account(), SCOPE, &[2, 3, 200], true, false)
            .unwrap());
    }

    #[test]
    fn test_wildcard_visible_only_when_included() {
        let registry = registry();
        grant(&registry, operator(), WILDCARD_SCOPE, &[11]);

        assert!(!registry.has_permission(operator(), account(), SCOPE, 11, false, false).unwrap());
        assert!(registry.has_permission(operator(), account(), SCOPE, 11, false, true).unwrap());
    }

    #[test]
    fn test_stranger_cannot_write() {
        let registry = registry();
        let err = registry
            .set_permissions_for(
                &CallContext::direct(stranger()),
                account(),
                PermissionsData::new(stranger(), SCOPE, vec![5]),
            )
            .unwrap_err();
        assert!(matches!(err, PermsError::Unauthorized { .. }));
    }

    #[test]
    fn test_root_operator_can_delegate_non_root() {
        let registry = registry();
        grant(&registry, operator(), SCOPE, &[ROOT as u16]);

        let record = registry
            .set_permissions_for(
                &CallContext::direct(operator()),
                account(),
                PermissionsData::new(stranger(), SCOPE, vec![5, 6]),
            )
            .unwrap();
        assert_eq!(record.caller, operator());
        assert!(registry.has_permission(stranger(), account(), SCOPE, 6, false, false).unwrap());
    }

    #[test]
    fn test_root_operator_cannot_grant_root() {
        let registry = registry();
        grant(&registry, operator(), SCOPE, &[ROOT as u16]);

        let err = registry
            .set_permissions_for(
                &CallContext::direct(operator()),
                account(),
                PermissionsData::new(stranger(), SCOPE, vec![ROOT as u16]),
            )
            .unwrap_err();
        assert!(matches!(err, PermsError::Unauthorized { .. }));
    }

    #[test]
    fn test_root_operator_cannot_write_wildcard() {
        let registry = registry();
        grant(&registry, operator(), WILDCARD_SCOPE, &[ROOT as u16]);

        let err = registry
            .set_permissions_for(
                &CallContext::direct(operator()),
                account(),
                PermissionsData::new(stranger(), WILDCARD_SCOPE, vec![5]),
            )
            .unwrap_err();
        assert!(matches!(err, PermsError::Unauthorized { .. }));
    }

    #[test]
    fn test_wildcard_root_authorizes_scoped_write() {
        let registry = registry();
        grant(&registry, operator(), WILDCARD_SCOPE, &[ROOT as u16]);

        registry
            .set_permissions_for(
                &CallContext::direct(operator()),
                account(),
                PermissionsData::new(stranger(), SCOPE, vec![5]),
            )
            .unwrap();
        assert!(registry.has_permission(stranger(), account(), SCOPE, 5, false, false).unwrap());
    }

    #[test]
    fn test_relayed_write_attributed_to_original_sender() {
        let forwarder = Address::from_low_u64(99);
        let registry = PermissionRegistry::new(
            PermissionsConfig::default(),
            Arc::new(TrustedForwarder::new(forwarder)),
        );

        let record = registry
            .set_permissions_for(
                &CallContext::relayed(forwarder, b"set", account()),
                account(),
                PermissionsData::new(operator(), SCOPE, vec![4]),
            )
            .unwrap();
        assert_eq!(record.caller, account());
    }

    #[test]
    fn test_record_contents() {
        let registry = registry();
        let record = registry
            .set_permissions_for(
                &CallContext::direct(account()),
                account(),
                PermissionsData::new(operator(), SCOPE, vec![9, 4, 9]),
            )
            .unwrap();
        assert_eq!(record.operator, operator());
        assert_eq!(record.account, account());
        assert_eq!(record.scope, SCOPE);
        assert_eq!(record.permission_ids, vec![9, 4, 9]);
        assert_eq!(record.packed, PermissionSet::from_ids(&[4, 9]).unwrap());
    }

    #[test]
    fn test_authorize_does_not_mutate() {
        let registry = registry();
        let write = registry
            .authorize_set(
                &CallContext::direct(account()),
                account(),
                PermissionsData::new(operator(), SCOPE, vec![5]),
            )
            .unwrap();
        assert!(registry.permissions_of(operator(), account(), SCOPE).is_empty());

        registry.commit(write).unwrap();
        assert!(registry.has_permission(operator(), account(), SCOPE, 5, false, false).unwrap());
    }

    fn delegate(registry: &PermissionRegistry, scope: ScopeId, ids: &[u16]) -> Result<PermissionsSet> {
        registry.set_permissions_for(
            &CallContext::direct(operator()),
            account(),
            PermissionsData::new(stranger(), scope, ids.to_vec()),
        )
    }

    #[test]
    fn test_revoked_root_stops_delegation() {
        let registry = registry();
        grant(&registry, operator(), SCOPE, &[ROOT as u16]);
        delegate(&registry, SCOPE, &[5]).unwrap();

        grant(&registry, operator(), SCOPE, &[5]);
        assert!(matches!(
            delegate(&registry, SCOPE, &[6]),
            Err(PermsError::Unauthorized { .. })
        ));
        assert_eq!(
            registry.permissions_of(stranger(), account(), SCOPE),
            PermissionSet::from_ids(&[5]).unwrap()
        );
    }

    #[test]
    fn test_revoked_wildcard_root_stops_delegation() {
        let registry = registry();
        grant(&registry, operator(), WILDCARD_SCOPE, &[ROOT as u16]);
        delegate(&registry, SCOPE, &[5]).unwrap();
        delegate(&registry, ScopeId(8), &[5]).unwrap();

        grant(&registry, operator(), WILDCARD_SCOPE, &[]);
        for scope in [SCOPE, ScopeId(8)] {
            assert!(matches!(
                delegate(&registry, scope, &[6]),
                Err(PermsError::Unauthorized { .. })
            ));
        }
    }

    #[test]
    fn test_commit_rechecks_revoked_root() {
        let registry = registry();
        grant(&registry, operator(), SCOPE, &[ROOT as u16]);
        let write = registry
            .authorize_set(
                &CallContext::direct(operator()),
                account(),
                PermissionsData::new(stranger(), SCOPE, vec![5]),
            )
            .unwrap();

        grant(&registry, operator(), SCOPE, &[]);
        assert!(matches!(
            registry.commit(write),
            Err(PermsError::Unauthorized { .. })
        ));
        assert!(registry.permissions_of(stranger(), account(), SCOPE).is_empty());
    }

    #[test]
    fn test_custom_root_id() {
        let registry = PermissionRegistry::new(
            PermissionsConfig {
                root_permission_id: NonZeroU8::new(200).unwrap(),
            },
            Arc::new(DirectCaller),
        );
        grant(&registry, operator(), SCOPE, &[200]);
        assert!(registry.has_permission(operator(), account(), SCOPE, 17, true, false).unwrap());
    }

    proptest! {
        #[test]
        fn test_any_valid_id_roundtrips(id in 1u16..=255) {
            let registry = registry();
            grant(&registry, operator(), SCOPE, &[id]);
            prop_assert!(registry.has_permission(operator(), account(), SCOPE, id, false, false).unwrap());
        }

        #[test]
        fn test_self_service_always_succeeds(ids in prop::collection::vec(1u16..=255, 0..16), scope in any::<u64>()) {
            let registry = registry();
            let result = registry.set_permissions_for(
                &CallContext::direct(account()),
                account(),
                PermissionsData::new(operator(), ScopeId(scope), ids.clone()),
            );
            prop_assert!(result.is_ok());
            prop_assert!(registry
                .has_all_permissions(operator(), account(), ScopeId(scope), &ids, false, false)
                .unwrap());
        }

        #[test]
        fn test_out_of_range_ids_rejected(id in 256u16..) {
            let registry = registry();
            prop_assert!(matches!(
                registry.has_permission(operator(), account(), SCOPE, id, false, false),
                Err(PermsError::PermissionIdOutOfBounds(_))
            ));
        }
    }
}
