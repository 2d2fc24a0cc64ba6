//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keystone_core::{Address, CurrencyId, ScopeId};
use keystone_perms::PermissionsData;

/// A random address, possibly zero.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// A random non-zero address.
pub fn nonzero_address() -> impl Strategy<Value = Address> {
    address().prop_filter("zero address", |a| !a.is_zero())
}

/// Any scope, including the wildcard/default scope 0.
pub fn scope_id() -> impl Strategy<Value = ScopeId> {
    any::<u64>().prop_map(ScopeId)
}

/// A scope other than 0.
pub fn project_scope() -> impl Strategy<Value = ScopeId> {
    (1u64..=u64::MAX).prop_map(ScopeId)
}

/// A non-zero currency.
pub fn currency_id() -> impl Strategy<Value = CurrencyId> {
    (1u32..=u32::MAX).prop_map(CurrencyId)
}

/// A grantable permission id.
pub fn permission_id() -> impl Strategy<Value = u16> {
    1u16..=255
}

/// Any raw id a caller could submit, valid or not.
pub fn raw_permission_id() -> impl Strategy<Value = u16> {
    prop_oneof![
        8 => permission_id(),
        1 => Just(0u16),
        1 => 256u16..=u16::MAX,
    ]
}

/// Up to `max_len` grantable ids, duplicates allowed.
pub fn permission_ids(max_len: usize) -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(permission_id(), 0..=max_len)
}

/// Precision for which `10^decimals` fits in a u128.
pub fn decimals() -> impl Strategy<Value = u8> {
    0u8..=38
}

/// Parameters for a self-service permission write.
#[derive(Debug, Clone)]
pub struct WriteParams {
    pub account: Address,
    pub operator: Address,
    pub scope: ScopeId,
    pub permission_ids: Vec<u16>,
}

impl WriteParams {
    pub fn data(&self) -> PermissionsData {
        PermissionsData::new(self.operator, self.scope, self.permission_ids.clone())
    }
}

impl Arbitrary for WriteParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (nonzero_address(), nonzero_address(), scope_id(), permission_ids(16))
            .prop_map(|(account, operator, scope, permission_ids)| WriteParams {
                account,
                operator,
                scope,
                permission_ids,
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use keystone_core::{CallContext, DirectCaller};
    use keystone_perms::{PermissionRegistry, PermissionsConfig, PermsError};

    fn registry() -> PermissionRegistry {
        PermissionRegistry::new(PermissionsConfig::default(), Arc::new(DirectCaller))
    }

    proptest! {
        #[test]
        fn self_writes_are_readable(params: WriteParams) {
            let registry = registry();
            registry
                .set_permissions_for(&CallContext::direct(params.account), params.account, params.data())
                .unwrap();

            let held = registry
                .has_all_permissions(params.operator, params.account, params.scope, &params.permission_ids, false, false)
                .unwrap();
            prop_assert!(held);
        }

        #[test]
        fn raw_ids_validate_consistently(params: WriteParams, id in raw_permission_id()) {
            let registry = registry();
            let mut data = params.data();
            data.permission_ids.push(id);

            let result = registry.set_permissions_for(&CallContext::direct(params.account), params.account, data);
            match id {
                0 => prop_assert!(matches!(result, Err(PermsError::ZeroPermissionForbidden))),
                1..=255 => prop_assert!(result.is_ok()),
                _ => prop_assert!(matches!(result, Err(PermsError::PermissionIdOutOfBounds(found)) if found == id)),
            }
        }

        #[test]
        fn non_root_strangers_cannot_write(params: WriteParams, stranger in nonzero_address()) {
            prop_assume!(stranger != params.account);
            let registry = registry();
            let result = registry.set_permissions_for(&CallContext::direct(stranger), params.account, params.data());
            let rejected = matches!(result, Err(PermsError::Unauthorized { .. }));
            prop_assert!(rejected);
        }
    }
}
