use crate::{
    config::{ReplyMode, ServerConfig},
    error::DhcpError,
    v4::{self, DhcpOption, Message, OpCode},
};
use bytes::Bytes;
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};
use tokio::sync::mpsc::UnboundedSender;

/// An encoded reply waiting for the socket writer task.
#[derive(Debug)]
pub(crate) struct Outgoing {
    pub target: SocketAddr,
    pub packet: Bytes,
}

/// Sends OFFERs in answer to a DISCOVER.
pub trait OfferWriter {
    fn send_offer(&self, offered_ip: Ipv4Addr, extra: Vec<DhcpOption>) -> Result<(), DhcpError>;
}

/// Sends ACKs and NAKs in answer to a REQUEST.
pub trait AckWriter {
    fn send_ack(&self, assigned_ip: Ipv4Addr, extra: Vec<DhcpOption>) -> Result<(), DhcpError>;
    fn send_nak(&self, reason: &str, extra: Vec<DhcpOption>) -> Result<(), DhcpError>;
}

/// Reply channel bound to one incoming request.
pub struct ResponseWriter {
    request: Arc<Message>,
    source: SocketAddr,
    destination: SocketAddr,
    server_ip: Option<Ipv4Addr>,
    outgoing: UnboundedSender<Outgoing>,
}

impl ResponseWriter {
    pub(crate) fn new(
        request: Arc<Message>,
        source: SocketAddr,
        config: &ServerConfig,
        outgoing: UnboundedSender<Outgoing>,
    ) -> Self {
        let destination = match config.reply_mode {
            ReplyMode::Broadcast => {
                SocketAddrV4::new(config.broadcast_address, config.client_port).into()
            }
            ReplyMode::Unicast => source,
        };

        Self {
            request,
            source,
            destination,
            server_ip: config.server_ip,
            outgoing,
        }
    }

    pub fn request(&self) -> &Message {
        &self.request
    }

    /// Where the request came from.
    pub fn source(&self) -> SocketAddr {
        self.source
    }

    /// Where replies written through this writer are sent.
    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Queues `msg` as the reply to this writer's request.
    ///
    /// `extra` options replace any option of the same code already on
    /// `msg`. The op code and xid are always forced to match the request.
    pub fn write_response(&self, mut msg: Message, extra: Vec<DhcpOption>) -> Result<(), DhcpError> {
        msg.extend_options(extra);
        msg.op = OpCode::BootReply;
        msg.xid = self.request.xid;

        if let Some(server_ip) = self.server_ip {
            msg.siaddr = server_ip;
            if msg.server_identifier().is_none() {
                msg.set_option(DhcpOption::ServerIdentifier(server_ip));
            }
        }

        let packet = msg.encode()?;
        tracing::debug!(
            "Queueing {:?} ({} bytes, xid {:#010x}) for {}",
            msg.message_type(),
            packet.len(),
            msg.xid,
            self.destination
        );

        self.outgoing
            .send(Outgoing {
                target: self.destination,
                packet,
            })
            .map_err(|_| DhcpError::ServerClosed)
    }
}

impl OfferWriter for ResponseWriter {
    fn send_offer(&self, offered_ip: Ipv4Addr, extra: Vec<DhcpOption>) -> Result<(), DhcpError> {
        self.write_response(v4::new_offer(&self.request, offered_ip), extra)
    }
}

impl AckWriter for ResponseWriter {
    fn send_ack(&self, assigned_ip: Ipv4Addr, extra: Vec<DhcpOption>) -> Result<(), DhcpError> {
        self.write_response(v4::new_ack(&self.request, assigned_ip), extra)
    }

    fn send_nak(&self, reason: &str, extra: Vec<DhcpOption>) -> Result<(), DhcpError> {
        self.write_response(v4::new_nak(&self.request, reason), extra)
    }
}
