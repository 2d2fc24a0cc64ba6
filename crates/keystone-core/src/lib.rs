//! # Keystone Core
//!
//! Pure primitives shared by the Keystone registries: addresses, scope and
//! currency identifiers, the 256-bit permission set, caller identity
//! resolution and the observable event records.
//!
//! This crate contains no I/O, no storage, no locking. It is pure computation
//! over small value types.
//!
//! ## Key Types
//!
//! - [`Address`] - A 20-byte account, operator, or feed address
//! - [`ScopeId`] - Identifier of a tenant/project
//! - [`CurrencyId`] - Identifier of a currency in price queries
//! - [`PermissionSet`] - Fixed-width 256-bit permission bit-set
//! - [`IdentityResolver`] - Resolves the effective sender of a call
//! - [`EventRecord`] - Observable record emitted by every accepted write
//!
//! ## Canonicalization
//!
//! Event records are encoded using deterministic CBOR and content-addressed
//! with Blake3. See [`event`] module.

pub mod canonical;
pub mod error;
pub mod event;
pub mod identity;
pub mod permission_set;
pub mod types;

pub use error::CoreError;
pub use event::{
    EventId, EventKind, EventRecord, OwnershipTransferred, PermissionsSet, PriceFeedAdded,
};
pub use identity::{CallContext, DirectCaller, IdentityResolver, TrustedForwarder};
pub use permission_set::{PermissionSet, MAX_PERMISSION_ID};
pub use types::{Address, CurrencyId, ScopeId};
