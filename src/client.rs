//! DHCP client implementation
//!
//! Each public operation is one request/response exchange: build the
//! message, send it, then wait for the matching BOOTREPLY until a single
//! deadline expires. No retransmission happens here; callers that want
//! retries call the operation again.

use crate::{
    config::ClientConfig,
    error::DhcpError,
    network,
    v4::{self, DhcpOption, Message, MessageType, OpCode, OptionRegistry},
};
use std::{
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
    time::Duration,
};
use tokio::{
    net::UdpSocket,
    time::{self, Instant},
};

const MAX_DATAGRAM_LEN: usize = 2048;

/// Lease parameters granted by a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub address: Ipv4Addr,
    pub subnet_mask: Option<Ipv4Addr>,
    pub routers: Option<Vec<Ipv4Addr>>,
    pub dns_servers: Option<Vec<Ipv4Addr>>,
    pub lease_duration: Option<Duration>,
    pub renewal_time: Option<Duration>,
    pub rebinding_time: Option<Duration>,
    pub server_identifier: Option<Ipv4Addr>,
}

impl Lease {
    /// Extracts the lease parameters carried by an ACK.
    pub fn from_ack(msg: &Message) -> Self {
        let mut lease = Self {
            address: msg.yiaddr,
            subnet_mask: None,
            routers: None,
            dns_servers: None,
            lease_duration: None,
            renewal_time: None,
            rebinding_time: None,
            server_identifier: None,
        };

        for option in msg.options() {
            match option {
                DhcpOption::SubnetMask(mask) => lease.subnet_mask = Some(*mask),
                DhcpOption::Router(routers) => lease.routers = Some(routers.clone()),
                DhcpOption::DomainNameServer(dns) => lease.dns_servers = Some(dns.clone()),
                DhcpOption::LeaseTime(secs) => {
                    lease.lease_duration = Some(Duration::from_secs(u64::from(*secs)))
                }
                DhcpOption::RenewalTime(secs) => {
                    lease.renewal_time = Some(Duration::from_secs(u64::from(*secs)))
                }
                DhcpOption::RebindingTime(secs) => {
                    lease.rebinding_time = Some(Duration::from_secs(u64::from(*secs)))
                }
                DhcpOption::ServerIdentifier(ip) => lease.server_identifier = Some(*ip),
                _ => {}
            }
        }

        lease
    }
}

pub struct DhcpClient {
    config: ClientConfig,
    socket: UdpSocket,
    registry: Arc<OptionRegistry>,
}

impl DhcpClient {
    pub async fn new(config: ClientConfig) -> Result<Self, DhcpError> {
        let socket = network::new_udp_socket(
            SocketAddrV4::new(config.bind_address, config.client_port),
            config.interface.as_deref(),
        )?;

        tracing::debug!("DHCP client bound to {}", socket.local_addr()?);

        Ok(Self {
            config,
            socket,
            registry: Arc::new(OptionRegistry::new()),
        })
    }

    /// Replaces the registry used to decode replies.
    pub fn with_registry(mut self, registry: OptionRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DhcpError> {
        Ok(self.socket.local_addr()?)
    }

    /// Remembers the server used for renew, release and inform.
    pub fn set_server(&mut self, server: Ipv4Addr) {
        self.config.server = Some(server);
    }

    /// Remembers the address this client currently holds.
    pub fn set_client_ip(&mut self, client_ip: Ipv4Addr) {
        self.config.client_ip = Some(client_ip);
    }

    fn broadcast_target(&self) -> SocketAddr {
        SocketAddrV4::new(self.config.broadcast_address, self.config.server_port).into()
    }

    fn unicast_target(&self, server: Ipv4Addr) -> SocketAddr {
        SocketAddrV4::new(server, self.config.server_port).into()
    }

    fn known_client_ip(&self) -> Result<Ipv4Addr, DhcpError> {
        self.config
            .client_ip
            .ok_or(DhcpError::MissingState("client IP address"))
    }

    fn known_server(&self) -> Result<Ipv4Addr, DhcpError> {
        self.config
            .server
            .ok_or(DhcpError::MissingState("server address"))
    }

    /// Stamps the hardware address and client identifier on an outgoing message.
    fn identify(&self, msg: &mut Message) {
        msg.set_mac_address(self.config.mac_address);
        msg.set_option(DhcpOption::client_identifier_from_mac(
            self.config.mac_address.into_array(),
        ));
    }

    fn announce(&self, msg: &mut Message) {
        if let Some(hostname) = &self.config.hostname {
            msg.set_host_name(hostname);
        }
        if !self.config.parameter_request_list.is_empty() {
            msg.set_option(DhcpOption::ParameterRequestList(
                self.config.parameter_request_list.clone(),
            ));
        }
    }

    pub async fn send_message(&self, target: SocketAddr, msg: &Message) -> Result<(), DhcpError> {
        let packet = msg.encode()?;
        let sent = self.socket.send_to(&packet, target).await?;
        tracing::debug!(
            "Sent {:?} ({} bytes, xid {:#010x}) to {}",
            msg.message_type(),
            sent,
            msg.xid,
            target
        );
        Ok(())
    }

    /// Waits for the BOOTREPLY answering transaction `xid`.
    ///
    /// Replies for other transactions are skipped; the deadline covers the
    /// whole wait, not each datagram.
    pub async fn receive(&self, xid: u32) -> Result<Message, DhcpError> {
        let deadline = Instant::now() + self.config.timeout;
        let mut buf = [0u8; MAX_DATAGRAM_LEN];

        loop {
            tracing::debug!("Waiting for response with timeout: {:?}", self.config.timeout);
            let (len, addr) = match time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await
            {
                Ok(Ok(received)) => received,
                Ok(Err(e)) => {
                    tracing::error!("Socket receive error: {}", e);
                    return Err(DhcpError::Io(e));
                }
                Err(_) => {
                    tracing::debug!("Timeout waiting for response");
                    return Err(DhcpError::Timeout(self.config.timeout));
                }
            };

            tracing::debug!("Received {} bytes from {}", len, addr);
            let msg = Message::decode_with(&buf[..len], &self.registry).map_err(|e| {
                tracing::error!("Failed to decode DHCP message: {}", e);
                DhcpError::MalformedMessage(e)
            })?;

            if msg.op != OpCode::BootReply {
                return Err(DhcpError::UnexpectedOpCode(msg.op.into()));
            }
            if msg.xid != xid {
                tracing::debug!(
                    "XID mismatch (got {:#010x}, want {:#010x}), ignoring packet",
                    msg.xid,
                    xid
                );
                continue;
            }

            return Ok(msg);
        }
    }

    async fn exchange(&self, target: SocketAddr, msg: &Message) -> Result<Message, DhcpError> {
        self.send_message(target, msg).await?;
        self.receive(msg.xid).await
    }

    /// Broadcasts a DISCOVER and returns the first reply.
    pub async fn discover(&self) -> Result<Message, DhcpError> {
        let mut msg = v4::new_discover();
        self.identify(&mut msg);
        self.announce(&mut msg);
        self.exchange(self.broadcast_target(), &msg).await
    }

    /// Broadcasts a REQUEST selecting `offer`.
    pub async fn request(&self, offer: &Message) -> Result<Message, DhcpError> {
        let mut msg = v4::new_request();
        msg.xid = offer.xid;
        self.identify(&mut msg);
        self.announce(&mut msg);
        msg.set_option(DhcpOption::RequestedIpAddress(offer.yiaddr));
        if let Some(server) = offering_server(offer) {
            msg.set_option(DhcpOption::ServerIdentifier(server));
        }
        self.exchange(self.broadcast_target(), &msg).await
    }

    /// Tells the server the offered address is already in use.
    pub async fn decline(&self, offer: &Message, reason: Option<&str>) -> Result<Message, DhcpError> {
        let mut msg = v4::new_decline(offer.yiaddr, offering_server(offer));
        msg.xid = offer.xid;
        self.identify(&mut msg);
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            msg.set_text_message(reason);
        }
        self.exchange(self.broadcast_target(), &msg).await
    }

    /// Asks the known server to extend the lease on the known client address.
    pub async fn renew(&self) -> Result<Message, DhcpError> {
        let client_ip = self.known_client_ip()?;
        let server = self.known_server()?;
        let mut msg = v4::new_renew(client_ip);
        self.identify(&mut msg);
        self.announce(&mut msg);
        self.exchange(self.unicast_target(server), &msg).await
    }

    /// Gives the known client address back to the known server.
    pub async fn release(&self) -> Result<Message, DhcpError> {
        let client_ip = self.known_client_ip()?;
        let server = self.known_server()?;
        let mut msg = v4::new_release(client_ip);
        self.identify(&mut msg);
        msg.set_option(DhcpOption::ServerIdentifier(server));
        self.exchange(self.unicast_target(server), &msg).await
    }

    /// Requests configuration parameters for an already configured address.
    /// Goes straight to the server when it is known, otherwise broadcasts.
    pub async fn inform(&self) -> Result<Message, DhcpError> {
        let client_ip = self.known_client_ip()?;
        let mut msg = v4::new_inform(client_ip);
        self.identify(&mut msg);
        self.announce(&mut msg);
        let target = match self.config.server {
            Some(server) => {
                msg.siaddr = server;
                self.unicast_target(server)
            }
            None => self.broadcast_target(),
        };
        self.exchange(target, &msg).await
    }

    /// Runs DISCOVER then REQUEST and returns the granted lease.
    ///
    /// On success the leased address and the granting server are remembered
    /// so that `renew`, `release` and `inform` can follow.
    pub async fn obtain_lease(&mut self) -> Result<Lease, DhcpError> {
        let offer = self.discover().await?;
        expect_type(&offer, MessageType::Offer)?;
        tracing::info!(
            "Received DHCP OFFER of {} from {:?}",
            offer.yiaddr,
            offering_server(&offer)
        );

        let reply = self.request(&offer).await?;
        match reply.message_type() {
            Some(MessageType::Ack) => {
                let lease = Lease::from_ack(&reply);
                tracing::info!("DHCP Bind Successful! Lease: {:?}", lease);
                self.set_client_ip(lease.address);
                if let Some(server) = lease.server_identifier.or_else(|| offering_server(&offer)) {
                    self.set_server(server);
                }
                Ok(lease)
            }
            Some(MessageType::Nak) => {
                let reason = reply.text_message().unwrap_or_default().to_string();
                tracing::warn!("Received DHCP NAK: {}", reason);
                Err(DhcpError::Nak(reason))
            }
            actual => Err(DhcpError::UnexpectedMessageType {
                expected: MessageType::Ack,
                actual,
            }),
        }
    }
}

/// The server behind an offer: its server identifier option, else siaddr.
fn offering_server(offer: &Message) -> Option<Ipv4Addr> {
    offer
        .server_identifier()
        .or_else(|| (!offer.siaddr.is_unspecified()).then_some(offer.siaddr))
}

fn expect_type(msg: &Message, expected: MessageType) -> Result<(), DhcpError> {
    match msg.message_type() {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(DhcpError::UnexpectedMessageType { expected, actual }),
    }
}
