//! Who controls a scope.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use keystone_core::{Address, ScopeId};

/// Answers whether an address is the registered controller of a scope.
pub trait ScopeAuthority: Send + Sync {
    fn is_controller_of(&self, scope: ScopeId, address: &Address) -> bool;
}

/// In-memory scope -> controller directory.
#[derive(Debug, Default)]
pub struct ControllerDirectory {
    controllers: RwLock<HashMap<ScopeId, Address>>,
}

impl ControllerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the controller of `scope`. Returns the previous one.
    pub fn set_controller(&self, scope: ScopeId, controller: Address) -> Option<Address> {
        self.controllers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope, controller)
    }

    /// The controller of `scope`, if any.
    pub fn controller_of(&self, scope: ScopeId) -> Option<Address> {
        self.controllers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&scope)
            .copied()
    }
}

impl ScopeAuthority for ControllerDirectory {
    fn is_controller_of(&self, scope: ScopeId, address: &Address) -> bool {
        self.controller_of(scope).as_ref() == Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_lookup() {
        let directory = ControllerDirectory::new();
        let controller = Address::from_low_u64(5);

        assert!(!directory.is_controller_of(ScopeId(1), &controller));
        assert_eq!(directory.set_controller(ScopeId(1), controller), None);
        assert!(directory.is_controller_of(ScopeId(1), &controller));
        assert!(!directory.is_controller_of(ScopeId(2), &controller));

        let next = Address::from_low_u64(6);
        assert_eq!(directory.set_controller(ScopeId(1), next), Some(controller));
        assert!(!directory.is_controller_of(ScopeId(1), &controller));
    }
}
