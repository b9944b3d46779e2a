//! # dhcp4 - DHCPv4 messages, client and server in Rust
//!
//! dhcp4 implements the DHCPv4 wire protocol together with the two ends
//! that speak it: a client that walks the DORA exchange (Discover, Offer,
//! Request, Acknowledge) plus renew, release, decline and inform, and a
//! server that decodes requests and routes them to user handlers by
//! message type.
//!
//! ## Features
//!
//! - Byte-exact message codec with a pluggable option registry
//! - Canonical constructors for every message in an exchange
//! - Asynchronous client and server on Tokio
//! - Layered error types
//! - Interface-bound broadcast sockets (Linux focus)
//!
//! ## Example
//!
//! ```rust,no_run
//! use dhcp4::{ClientConfig, DhcpClient};
//! use macaddr::MacAddr6;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = ClientConfig::new(MacAddr6::new(0x00, 0x0c, 0x29, 0xa8, 0x92, 0xf4));
//!     config.interface = Some("eth0".to_string());
//!     let mut client = DhcpClient::new(config).await?;
//!     let lease = client.obtain_lease().await?;
//!     println!("Obtained lease: {:?}", lease);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod network;
pub mod server;
pub mod v4;

pub use client::{DhcpClient, Lease};
pub use config::{ClientConfig, DecodeFailurePolicy, ReplyMode, ServerConfig};
pub use error::DhcpError;
pub use server::{
    AckWriter, Handler, MuxHandler, OfferWriter, ResponseWriter, Server, ServerMux,
};
