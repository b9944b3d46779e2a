use clap::Parser;
use dhcp4::{
    config::{Args, ClientAction, ClientArgs, Command, ServerArgs},
    v4::{DhcpOption, Message},
    AckWriter, ClientConfig, DhcpClient, DhcpError, MuxHandler, OfferWriter, ReplyMode,
    ResponseWriter, Server, ServerConfig, ServerMux,
};
use macaddr::MacAddr6;
use std::{error::Error as StdError, net::Ipv4Addr, time::Duration};
use tokio::fs;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn StdError>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    match args.command {
        Command::Client(args) => run_client(args).await?,
        Command::Server(args) => run_server(args).await?,
    }

    Ok(())
}

/// Reads the hardware (MAC) address of `interface` from sysfs.
async fn read_mac_address(interface: &str) -> Result<MacAddr6, DhcpError> {
    let mac_path = format!("/sys/class/net/{}/address", interface);
    let mac_str = fs::read_to_string(&mac_path).await?;
    mac_str
        .trim()
        .parse()
        .map_err(|_| DhcpError::InvalidMac(mac_str.trim().to_string()))
}

async fn run_client(args: ClientArgs) -> Result<(), DhcpError> {
    let mac_address = match (args.mac, args.interface.as_deref()) {
        (Some(mac), _) => mac,
        (None, Some(interface)) => read_mac_address(interface).await?,
        (None, None) => {
            return Err(DhcpError::MissingState(
                "MAC address (pass --mac or --interface)",
            ))
        }
    };
    tracing::info!("Using MAC address {}", mac_address);

    let mut config = ClientConfig::new(mac_address);
    config.interface = args.interface;
    config.hostname = args.hostname;
    config.timeout = Duration::from_secs(args.timeout);
    config.server = args.server;
    config.client_ip = args.client_ip;

    let mut client = DhcpClient::new(config).await?;

    match args.action {
        ClientAction::Lease => {
            let lease = client.obtain_lease().await?;
            println!("Obtained lease: {:#?}", lease);
        }
        ClientAction::Discover => print_reply(client.discover().await?),
        ClientAction::Renew => print_reply(client.renew().await?),
        ClientAction::Inform => print_reply(client.inform().await?),
        ClientAction::Release => match client.release().await {
            Ok(reply) => print_reply(reply),
            // Servers are not required to answer a RELEASE.
            Err(DhcpError::Timeout(_)) => tracing::info!("Release sent"),
            Err(e) => return Err(e),
        },
    }

    Ok(())
}

fn print_reply(msg: Message) {
    println!("{}", msg);
}

/// Hands the same address to every client.
struct StaticLeaseHandler {
    address: Ipv4Addr,
    options: Vec<DhcpOption>,
}

impl StaticLeaseHandler {
    fn from_args(args: &ServerArgs) -> Self {
        let mut options = vec![DhcpOption::LeaseTime(args.lease_time)];
        if let Some(mask) = args.subnet_mask {
            options.push(DhcpOption::SubnetMask(mask));
        }
        if let Some(router) = args.router {
            options.push(DhcpOption::Router(vec![router]));
        }
        if !args.dns.is_empty() {
            options.push(DhcpOption::DomainNameServer(args.dns.clone()));
        }

        Self {
            address: args.offer_ip,
            options,
        }
    }

    fn ack_if(&self, matches: bool, request: &Message, writer: &dyn AckWriter) {
        let result = if matches {
            tracing::info!("ACK {} to {}", self.address, request.mac_address());
            writer.send_ack(self.address, self.options.clone())
        } else {
            tracing::info!("NAK to {}", request.mac_address());
            writer.send_nak("requested address not available", Vec::new())
        };
        if let Err(e) = result {
            tracing::error!("Failed to reply to {}: {}", request.mac_address(), e);
        }
    }
}

impl MuxHandler for StaticLeaseHandler {
    fn handle_discover(&self, request: &Message, writer: &dyn OfferWriter) {
        tracing::info!("OFFER {} to {}", self.address, request.mac_address());
        if let Err(e) = writer.send_offer(self.address, self.options.clone()) {
            tracing::error!("Failed to send offer: {}", e);
        }
    }

    fn handle_request(&self, request: &Message, writer: &dyn AckWriter) {
        self.ack_if(request.requested_ip() == Some(self.address), request, writer);
    }

    fn handle_renew(&self, request: &Message, writer: &dyn AckWriter) {
        self.ack_if(request.ciaddr == self.address, request, writer);
    }

    fn handle_decline(&self, request: &Message, _writer: &ResponseWriter) {
        tracing::warn!(
            "{} declined {:?}: {}",
            request.mac_address(),
            request.requested_ip(),
            request.text_message().unwrap_or("no reason given")
        );
    }

    fn handle_release(&self, request: &Message, _writer: &ResponseWriter) {
        tracing::info!("{} released {}", request.mac_address(), request.ciaddr);
    }
}

async fn run_server(args: ServerArgs) -> Result<(), DhcpError> {
    let mut config = ServerConfig::new(args.listen);
    config.interface = args.interface.clone();
    config.server_ip = args.server_ip;
    config.max_in_flight = args.max_in_flight;
    if args.unicast {
        config.reply_mode = ReplyMode::Unicast;
    }

    let handler = StaticLeaseHandler::from_args(&args);
    let server = Server::bind(config).await?;

    server
        .serve_with_shutdown(ServerMux::new(handler), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
}
