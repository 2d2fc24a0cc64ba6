//! Caller identity resolution.
//!
//! Both registries attribute writes to an effective sender. For direct calls
//! that is the immediate caller. For relayed calls, a trusted forwarder
//! appends the original sender as the trailing 20 bytes of the payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::types::Address;

/// The raw context of an incoming call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// The immediate caller.
    pub sender: Address,
    /// The call payload.
    pub data: Bytes,
}

impl CallContext {
    /// A direct call with an empty payload.
    pub fn direct(sender: Address) -> Self {
        Self {
            sender,
            data: Bytes::new(),
        }
    }

    /// A direct call carrying a payload.
    pub fn with_data(sender: Address, data: impl Into<Bytes>) -> Self {
        Self {
            sender,
            data: data.into(),
        }
    }

    /// A call relayed by `forwarder` on behalf of `original`.
    ///
    /// The original sender is appended to the payload.
    pub fn relayed(forwarder: Address, payload: &[u8], original: Address) -> Self {
        let mut buf = BytesMut::with_capacity(payload.len() + Address::LEN);
        buf.put_slice(payload);
        buf.put_slice(original.as_bytes());
        Self {
            sender: forwarder,
            data: buf.freeze(),
        }
    }
}

/// Resolves the effective sender of a call.
pub trait IdentityResolver: Send + Sync {
    /// The address a write should be attributed to.
    fn effective_sender(&self, ctx: &CallContext) -> Address;
}

/// Attributes every call to its immediate caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectCaller;

impl IdentityResolver for DirectCaller {
    fn effective_sender(&self, ctx: &CallContext) -> Address {
        ctx.sender
    }
}

/// Honors relayed calls from a single trusted forwarder.
#[derive(Debug, Clone, Copy)]
pub struct TrustedForwarder {
    forwarder: Address,
}

impl TrustedForwarder {
    /// Trust calls relayed by `forwarder`.
    pub fn new(forwarder: Address) -> Self {
        Self { forwarder }
    }

    /// The trusted forwarder address.
    pub fn forwarder(&self) -> Address {
        self.forwarder
    }

    /// Whether `sender` is the trusted forwarder.
    pub fn is_trusted_forwarder(&self, sender: &Address) -> bool {
        *sender == self.forwarder
    }
}

impl IdentityResolver for TrustedForwarder {
    fn effective_sender(&self, ctx: &CallContext) -> Address {
        let len = ctx.data.len();
        if self.is_trusted_forwarder(&ctx.sender) && len >= Address::LEN {
            if let Ok(original) = Address::try_from(&ctx.data[len - Address::LEN..]) {
                return original;
            }
        }
        ctx.sender
    }
}
