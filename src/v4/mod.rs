//! DHCPv4 protocol implementation
//!
//! This module contains the DHCPv4 wire-level pieces:
//! - Option encoding and the registry that decodes option payloads
//! - Message framing (fixed header, magic cookie, option stream)
//! - Canonical message construction for every exchange step

pub mod builder;
pub mod message;
pub mod options;

#[cfg(test)]
mod tests;

use thiserror::Error;

pub use builder::{
    new_ack, new_boot_reply, new_boot_request, new_decline, new_discover, new_inform, new_nak,
    new_offer, new_release, new_renew, new_request, DEFAULT_LEASE_TIME,
};
pub use message::{Message, OpCode, MAGIC_COOKIE, MIN_MESSAGE_LEN};
pub use options::{DhcpOption, MessageType, OptionCode, OptionDecoder, OptionRegistry};

/// Errors produced while encoding or decoding DHCPv4 messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Message truncated: needed {needed} bytes but only {available} remain")]
    Truncated { needed: usize, available: usize },

    #[error("Malformed option {code}: {reason}")]
    MalformedOption { code: OptionCode, reason: String },

    #[error("Option {code} payload is {len} bytes, the limit is 255")]
    OptionTooLong { code: OptionCode, len: usize },

    #[error("Hardware address length {0} exceeds 16 bytes")]
    InvalidHardwareLength(u8),
}

impl CodecError {
    pub(crate) fn malformed(code: OptionCode, reason: impl Into<String>) -> Self {
        Self::MalformedOption {
            code,
            reason: reason.into(),
        }
    }
}
