//! Observable event records.
//!
//! Every accepted write to a registry produces exactly one record. Records
//! are append-only and externally indexable: each one has a deterministic
//! canonical encoding and a content address ([`EventId`]).

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{decode_value, encode_canonical, MapView};
use crate::error::CoreError;
use crate::permission_set::PermissionSet;
use crate::types::{Address, CurrencyId, ScopeId};

/// Record field keys (integer keys for compact encoding).
mod keys {
    pub const KIND: u64 = 0;

    pub const OPERATOR: u64 = 1;
    pub const ACCOUNT: u64 = 2;
    pub const SCOPE: u64 = 3;
    pub const PERMISSION_IDS: u64 = 4;
    pub const PACKED: u64 = 5;
    pub const CALLER: u64 = 6;

    pub const PRICING_CURRENCY: u64 = 7;
    pub const UNIT_CURRENCY: u64 = 8;
    pub const FEED: u64 = 9;

    pub const PREVIOUS_OWNER: u64 = 10;
    pub const NEW_OWNER: u64 = 11;
}

/// A 32-byte event identifier, computed as Blake3(canonical bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub [u8; 32]);

impl EventId {
    /// Compute the id of some canonical bytes.
    pub fn hash(canonical: &[u8]) -> Self {
        Self(*blake3::hash(canonical).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Discriminator for event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PermissionsSet,
    PriceFeedAdded,
    OwnershipTransferred,
}

impl EventKind {
    pub const fn to_u8(self) -> u8 {
        match self {
            EventKind::PermissionsSet => 0,
            EventKind::PriceFeedAdded => 1,
            EventKind::OwnershipTransferred => 2,
        }
    }

    pub const fn from_u8(n: u8) -> Option<Self> {
        match n {
            0 => Some(EventKind::PermissionsSet),
            1 => Some(EventKind::PriceFeedAdded),
            2 => Some(EventKind::OwnershipTransferred),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::PermissionsSet => "permissions_set",
            EventKind::PriceFeedAdded => "price_feed_added",
            EventKind::OwnershipTransferred => "ownership_transferred",
        }
    }
}

/// An operator's permission set for an account and scope was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsSet {
    pub operator: Address,
    pub account: Address,
    pub scope: ScopeId,
    /// The ids exactly as submitted (order and duplicates preserved).
    pub permission_ids: Vec<u8>,
    pub packed: PermissionSet,
    pub caller: Address,
}

/// A price feed was registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeedAdded {
    pub scope: ScopeId,
    pub pricing_currency: CurrencyId,
    pub unit_currency: CurrencyId,
    pub feed: Address,
    pub caller: Address,
}

/// The default-scope owner of the price resolver changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransferred {
    pub previous_owner: Address,
    pub new_owner: Address,
    pub caller: Address,
}

/// Any observable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventRecord {
    PermissionsSet(PermissionsSet),
    PriceFeedAdded(PriceFeedAdded),
    OwnershipTransferred(OwnershipTransferred),
}

impl EventRecord {
    /// The record kind.
    pub fn kind(&self) -> EventKind {
        match self {
            EventRecord::PermissionsSet(_) => EventKind::PermissionsSet,
            EventRecord::PriceFeedAdded(_) => EventKind::PriceFeedAdded,
            EventRecord::OwnershipTransferred(_) => EventKind::OwnershipTransferred,
        }
    }

    /// The scope the record applies to. Ownership changes belong to the default scope.
    pub fn scope(&self) -> ScopeId {
        match self {
            EventRecord::PermissionsSet(e) => e.scope,
            EventRecord::PriceFeedAdded(e) => e.scope,
            EventRecord::OwnershipTransferred(_) => ScopeId(0),
        }
    }

    /// The effective sender that caused the record.
    pub fn caller(&self) -> Address {
        match self {
            EventRecord::PermissionsSet(e) => e.caller,
            EventRecord::PriceFeedAdded(e) => e.caller,
            EventRecord::OwnershipTransferred(e) => e.caller,
        }
    }

    /// Deterministic CBOR encoding.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, CoreError> {
        encode_canonical(&self.to_cbor_value())
    }

    /// Content address of this record.
    pub fn compute_id(&self) -> Result<EventId, CoreError> {
        Ok(EventId::hash(&self.to_canonical_bytes()?))
    }

    /// Decode a record from its canonical bytes.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let value = decode_value(bytes)?;
        let map = MapView::new(&value)?;

        let kind = u8::try_from(map.uint(keys::KIND, "kind")?)
            .ok()
            .and_then(EventKind::from_u8)
            .ok_or_else(|| CoreError::DecodingError("unknown event kind".into()))?;

        match kind {
            EventKind::PermissionsSet => {
                let permission_ids = map
                    .uint_array(keys::PERMISSION_IDS, "permission_ids")?
                    .into_iter()
                    .map(|id| {
                        u8::try_from(id)
                            .map_err(|_| CoreError::DecodingError("permission id out of range".into()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(EventRecord::PermissionsSet(PermissionsSet {
                    operator: Address(map.bytes(keys::OPERATOR, "operator")?),
                    account: Address(map.bytes(keys::ACCOUNT, "account")?),
                    scope: ScopeId(map.uint(keys::SCOPE, "scope")?),
                    permission_ids,
                    packed: PermissionSet::from_be_bytes(map.bytes(keys::PACKED, "packed")?),
                    caller: Address(map.bytes(keys::CALLER, "caller")?),
                }))
            }
            EventKind::PriceFeedAdded => {
                let currency = |key: u64, name: &str| -> Result<CurrencyId, CoreError> {
                    u32::try_from(map.uint(key, name)?)
                        .map(CurrencyId)
                        .map_err(|_| CoreError::DecodingError(format!("{} out of range", name)))
                };
                Ok(EventRecord::PriceFeedAdded(PriceFeedAdded {
                    scope: ScopeId(map.uint(keys::SCOPE, "scope")?),
                    pricing_currency: currency(keys::PRICING_CURRENCY, "pricing_currency")?,
                    unit_currency: currency(keys::UNIT_CURRENCY, "unit_currency")?,
                    feed: Address(map.bytes(keys::FEED, "feed")?),
                    caller: Address(map.bytes(keys::CALLER, "caller")?),
                }))
            }
            EventKind::OwnershipTransferred => {
                Ok(EventRecord::OwnershipTransferred(OwnershipTransferred {
                    previous_owner: Address(map.bytes(keys::PREVIOUS_OWNER, "previous_owner")?),
                    new_owner: Address(map.bytes(keys::NEW_OWNER, "new_owner")?),
                    caller: Address(map.bytes(keys::CALLER, "caller")?),
                }))
            }
        }
    }

    fn to_cbor_value(&self) -> Value {
        let int = |n: u64| Value::Integer(n.into());
        let bytes = |b: &[u8]| Value::Bytes(b.to_vec());

        let mut entries = vec![(int(keys::KIND), int(self.kind().to_u8() as u64))];
        match self {
            EventRecord::PermissionsSet(e) => {
                entries.push((int(keys::OPERATOR), bytes(e.operator.as_bytes())));
                entries.push((int(keys::ACCOUNT), bytes(e.account.as_bytes())));
                entries.push((int(keys::SCOPE), int(e.scope.get())));
                entries.push((
                    int(keys::PERMISSION_IDS),
                    Value::Array(e.permission_ids.iter().map(|id| int(*id as u64)).collect()),
                ));
                entries.push((int(keys::PACKED), bytes(&e.packed.to_be_bytes())));
                entries.push((int(keys::CALLER), bytes(e.caller.as_bytes())));
            }
            EventRecord::PriceFeedAdded(e) => {
                entries.push((int(keys::SCOPE), int(e.scope.get())));
                entries.push((int(keys::PRICING_CURRENCY), int(e.pricing_currency.0 as u64)));
                entries.push((int(keys::UNIT_CURRENCY), int(e.unit_currency.0 as u64)));
                entries.push((int(keys::FEED), bytes(e.feed.as_bytes())));
                entries.push((int(keys::CALLER), bytes(e.caller.as_bytes())));
            }
            EventRecord::OwnershipTransferred(e) => {
                entries.push((int(keys::CALLER), bytes(e.caller.as_bytes())));
                entries.push((int(keys::PREVIOUS_OWNER), bytes(e.previous_owner.as_bytes())));
                entries.push((int(keys::NEW_OWNER), bytes(e.new_owner.as_bytes())));
            }
        }
        Value::Map(entries)
    }
}

impl From<PermissionsSet> for EventRecord {
    fn from(e: PermissionsSet) -> Self {
        EventRecord::PermissionsSet(e)
    }
}

impl From<PriceFeedAdded> for EventRecord {
    fn from(e: PriceFeedAdded) -> Self {
        EventRecord::PriceFeedAdded(e)
    }
}

impl From<OwnershipTransferred> for EventRecord {
    fn from(e: OwnershipTransferred) -> Self {
        EventRecord::OwnershipTransferred(e)
    }
}
