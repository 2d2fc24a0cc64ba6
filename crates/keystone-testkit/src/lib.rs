//! # Keystone Testkit
//!
//! Testing utilities for Keystone.
//!
//! ## Overview
//!
//! - **Fixtures**: a ledger over an in-memory journal with an owner and
//!   helpers for common setup
//! - **Generators**: proptest strategies for addresses, scopes, currencies
//!   and permission ids
//!
//! ## Test Fixtures
//!
//! ```rust
//! use keystone_core::{CurrencyId, ScopeId};
//! use keystone_testkit::fixtures::TestFixture;
//!
//! # tokio_test_block(async {
//! let fixture = TestFixture::new();
//! fixture
//!     .register_fixed_feed(ScopeId(0), CurrencyId(1), CurrencyId(2), 2000, 0)
//!     .await
//!     .unwrap();
//! assert_eq!(
//!     fixture.ledger.price_per_unit_of(ScopeId(5), CurrencyId(1), CurrencyId(2), 0).unwrap(),
//!     2000
//! );
//! # });
//! # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use keystone_testkit::generators::WriteParams;
//!
//! proptest! {
//!     #[test]
//!     fn self_writes_round_trip(params: WriteParams) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{random_address, random_addresses, TestFixture};
pub use generators::WriteParams;
