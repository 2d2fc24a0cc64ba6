//! # Keystone Store
//!
//! The append-only journal of registry events.
//!
//! ## Overview
//!
//! Every accepted registry write produces one [`EventRecord`]. The
//! [`EventStore`] trait persists those records in acceptance order, each
//! under a sequence number (starting at 1) and its content address. The
//! journal is what external indexers consume and what a registry is
//! rebuilt from after a restart.
//!
//! ## Key Types
//!
//! - [`EventStore`] - The async trait for all journal operations
//! - [`SqliteStore`] - SQLite-based persistent journal
//! - [`MemoryStore`] - In-memory journal for tests
//! - [`StoredEvent`] - A record together with its position and id
//!
//! ## Usage
//!
//! ```rust,no_run
//! use keystone_store::{EventStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("keystone.db").unwrap();
//!     let head = store.head_seq().await.unwrap();
//!     let events = store.events_range(1, head).await.unwrap();
//!     println!("{} events", events.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Every write is journaled**: writing the same content twice produces two
//!   entries, so replaying the journal in order reproduces the final state
//! - **Dense sequence numbers**: positions start at 1 and have no gaps
//! - **Content ids are not positions**: identical records share an id
//!
//! [`EventRecord`]: keystone_core::EventRecord

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{EventStore, StoredEvent};
