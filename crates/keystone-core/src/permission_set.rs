//! Fixed-width 256-bit permission set.
//!
//! Bit `i` set means permission `i` is granted. The set is stored as four
//! little-endian `u64` limbs so its width never depends on a native integer.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Largest valid permission id.
pub const MAX_PERMISSION_ID: u16 = 255;

const LIMBS: usize = 4;

/// A packed set of permission ids in the range `0..=255`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PermissionSet([u64; LIMBS]);

impl PermissionSet {
    /// The empty set.
    pub const EMPTY: Self = Self([0; LIMBS]);

    /// Create an empty set.
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Validate a raw id, returning it as a bit index.
    pub fn check_id(id: u16) -> Result<u8, CoreError> {
        if id > MAX_PERMISSION_ID {
            return Err(CoreError::PermissionIdOutOfBounds(id));
        }
        Ok(id as u8)
    }

    /// Pack a list of raw ids. Duplicates are idempotent and order is irrelevant.
    pub fn from_ids(ids: &[u16]) -> Result<Self, CoreError> {
        let mut set = Self::EMPTY;
        for &id in ids {
            set.insert(Self::check_id(id)?);
        }
        Ok(set)
    }

    /// Whether permission `id` is in the set.
    pub const fn contains(&self, id: u8) -> bool {
        let (limb, bit) = Self::locate(id);
        self.0[limb] & (1u64 << bit) != 0
    }

    /// Add permission `id` to the set.
    pub fn insert(&mut self, id: u8) {
        let (limb, bit) = Self::locate(id);
        self.0[limb] |= 1u64 << bit;
    }

    /// Remove permission `id` from the set.
    pub fn remove(&mut self, id: u8) {
        let (limb, bit) = Self::locate(id);
        self.0[limb] &= !(1u64 << bit);
    }

    /// Whether no permission is set.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|limb| *limb == 0)
    }

    /// Number of permissions in the set.
    pub fn len(&self) -> usize {
        self.0.iter().map(|limb| limb.count_ones() as usize).sum()
    }

    /// Iterate over the ids in the set, ascending.
    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(move |id| self.contains(*id))
    }

    /// The packed value as a 32-byte big-endian integer.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().rev().enumerate() {
            out[i * 8..(i + 1) * 8].copy_from_slice(&limb.to_be_bytes());
        }
        out
    }

    /// Rebuild a set from its 32-byte big-endian packed value.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; LIMBS];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            limbs[LIMBS - 1 - i] = u64::from_be_bytes(word);
        }
        Self(limbs)
    }

    const fn locate(id: u8) -> (usize, u32) {
        ((id / 64) as usize, (id % 64) as u32)
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids()).finish()
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl FromIterator<u8> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for id in iter {
            set.insert(id);
        }
        set
    }
}
