use crate::v4::{options::code, OptionCode, DEFAULT_LEASE_TIME};
use clap::{Parser, Subcommand, ValueEnum};
use macaddr::MacAddr6;
use std::{
    net::{Ipv4Addr, SocketAddrV4},
    time::Duration,
};

pub const DHCP_CLIENT_PORT: u16 = 68;
pub const DHCP_SERVER_PORT: u16 = 67;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single client exchange against a DHCP server
    Client(ClientArgs),
    /// Serve a single static address to any client that asks
    Server(ServerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ClientArgs {
    /// The network interface to bind to (e.g., 'eth0', 'lo')
    #[arg(short, long)]
    pub interface: Option<String>,

    /// Hardware address to use; read from the interface when omitted
    #[arg(short, long)]
    pub mac: Option<MacAddr6>,

    /// Host name to announce in DISCOVER and REQUEST
    #[arg(long)]
    pub hostname: Option<String>,

    /// Seconds to wait for each reply
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Known server address, required for renew and release
    #[arg(long)]
    pub server: Option<Ipv4Addr>,

    /// Currently leased address, required for renew, release and inform
    #[arg(long)]
    pub client_ip: Option<Ipv4Addr>,

    #[arg(short, long, value_enum, default_value_t = ClientAction::Lease)]
    pub action: ClientAction,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientAction {
    /// DISCOVER followed by REQUEST
    Lease,
    Discover,
    Renew,
    Release,
    Inform,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address and port to listen on
    #[arg(short, long, default_value_t = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DHCP_SERVER_PORT))]
    pub listen: SocketAddrV4,

    /// The network interface to bind to (e.g., 'eth0', 'lo')
    #[arg(short, long)]
    pub interface: Option<String>,

    /// The address handed to every client
    #[arg(long)]
    pub offer_ip: Ipv4Addr,

    /// This server's address, announced as the server identifier
    #[arg(long)]
    pub server_ip: Option<Ipv4Addr>,

    #[arg(long)]
    pub subnet_mask: Option<Ipv4Addr>,

    #[arg(long)]
    pub router: Option<Ipv4Addr>,

    /// DNS server to announce; may be repeated
    #[arg(long)]
    pub dns: Vec<Ipv4Addr>,

    /// Lease time in seconds
    #[arg(long, default_value_t = DEFAULT_LEASE_TIME)]
    pub lease_time: u32,

    /// Upper bound on concurrently running request handlers
    #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight: usize,

    /// Reply to the sender's address instead of broadcasting
    #[arg(long)]
    pub unicast: bool,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub interface: Option<String>,
    pub mac_address: MacAddr6,
    pub bind_address: Ipv4Addr,
    pub client_port: u16,
    pub server_port: u16,
    pub broadcast_address: Ipv4Addr,
    pub timeout: Duration,
    pub hostname: Option<String>,
    pub server: Option<Ipv4Addr>,
    pub client_ip: Option<Ipv4Addr>,
    pub parameter_request_list: Vec<OptionCode>,
}

impl ClientConfig {
    pub fn new(mac_address: MacAddr6) -> Self {
        Self {
            interface: None,
            mac_address,
            bind_address: Ipv4Addr::UNSPECIFIED,
            client_port: DHCP_CLIENT_PORT,
            server_port: DHCP_SERVER_PORT,
            broadcast_address: Ipv4Addr::BROADCAST,
            timeout: DEFAULT_TIMEOUT,
            hostname: None,
            server: None,
            client_ip: None,
            parameter_request_list: vec![
                code::SUBNET_MASK,
                code::ROUTER,
                code::DOMAIN_NAME_SERVER,
                code::DOMAIN_NAME,
            ],
        }
    }
}

/// Where the server sends replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyMode {
    /// To the configured broadcast address on the client port.
    Broadcast,
    /// Back to the address the request came from.
    Unicast,
}

/// What the server does with a datagram it cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailurePolicy {
    /// Log and keep serving.
    Drop,
    /// Stop serving and return the error.
    Abort,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_address: SocketAddrV4,
    pub interface: Option<String>,
    pub client_port: u16,
    pub broadcast_address: Ipv4Addr,
    pub reply_mode: ReplyMode,
    pub server_ip: Option<Ipv4Addr>,
    pub max_in_flight: usize,
    pub decode_failure: DecodeFailurePolicy,
}

impl ServerConfig {
    pub fn new(listen_address: SocketAddrV4) -> Self {
        Self {
            listen_address,
            interface: None,
            client_port: DHCP_CLIENT_PORT,
            broadcast_address: Ipv4Addr::BROADCAST,
            reply_mode: ReplyMode::Broadcast,
            server_ip: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            decode_failure: DecodeFailurePolicy::Drop,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, DHCP_SERVER_PORT))
    }
}
