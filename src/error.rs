use crate::{
    network::SocketError,
    v4::{CodecError, MessageType},
};
use std::{io, time::Duration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DhcpError {
    #[error("Socket operation failed")]
    Socket(#[from] SocketError),

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("Failed to encode DHCP message")]
    Codec(#[from] CodecError),

    #[error("Received a malformed DHCP message")]
    MalformedMessage(#[source] CodecError),

    #[error("Received unexpected op code {0}")]
    UnexpectedOpCode(u8),

    #[error("Expected {expected} but received {actual:?}")]
    UnexpectedMessageType {
        expected: MessageType,
        actual: Option<MessageType>,
    },

    #[error("Server refused the request: {0}")]
    Nak(String),

    #[error("No reply received within {0:?}")]
    Timeout(Duration),

    #[error("Operation requires a known {0}")]
    MissingState(&'static str),

    #[error("Failed to parse MAC address: {0}")]
    InvalidMac(String),

    #[error("Server stopped accepting replies")]
    ServerClosed,
}
