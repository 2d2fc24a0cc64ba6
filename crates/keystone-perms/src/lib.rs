//! # Keystone Permissions
//!
//! Accounts delegate scoped permissions to operators.
//!
//! ## Overview
//!
//! Each (operator, account, scope) triple maps to a 256-bit
//! [`PermissionSet`](keystone_core::PermissionSet). Bit `i` set means the
//! operator may exercise permission `i` on the account's behalf within the
//! scope. Two ids have special meaning:
//!
//! - **0** is reserved and can never be granted.
//! - **ROOT** ([`permission_ids::ROOT`]) satisfies every other check for the
//!   same operator, account and scope.
//!
//! Scope [`WILDCARD_SCOPE`] applies to every scope for an operator/account
//! pair, but only when the query asks for it.
//!
//! ## Writes
//!
//! `set_permissions_for` replaces the whole set for a key. An account may
//! always write its own operators' sets. Anyone else needs ROOT for that
//! account at the target scope, may not hand out ROOT, and may not write the
//! wildcard scope.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use keystone_core::{Address, CallContext, DirectCaller, ScopeId};
//! use keystone_perms::{PermissionRegistry, PermissionsConfig, PermissionsData};
//!
//! let registry = PermissionRegistry::new(PermissionsConfig::default(), Arc::new(DirectCaller));
//! let account = Address::from_low_u64(1);
//! let operator = Address::from_low_u64(2);
//!
//! registry
//!     .set_permissions_for(
//!         &CallContext::direct(account),
//!         account,
//!         PermissionsData::new(operator, ScopeId(7), vec![3, 4]),
//!     )
//!     .unwrap();
//!
//! assert!(registry.has_permission(operator, account, ScopeId(7), 3, false, false).unwrap());
//! ```

pub mod check;
pub mod error;
pub mod permission_ids;
pub mod registry;

pub use check::PermissionCheck;
pub use error::{PermsError, Result};
pub use registry::{
    PermissionRegistry, PermissionWrite, PermissionsConfig, PermissionsData, WILDCARD_SCOPE,
};
