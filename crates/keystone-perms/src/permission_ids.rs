//! Well-known permission ids.
//!
//! Id 0 is reserved and never granted. Ids other than ROOT carry no meaning
//! inside the registry; consumers assign them.

use std::num::NonZeroU8;

/// Satisfies every other permission check for its operator, account and scope.
pub const ROOT: u8 = 1;

/// [`ROOT`] as a non-zero id, the form configuration takes.
pub const ROOT_ID: NonZeroU8 = match NonZeroU8::new(ROOT) {
    Some(id) => id,
    None => panic!("ROOT must not be the reserved id"),
};

/// The reserved id.
pub const RESERVED: u8 = 0;
