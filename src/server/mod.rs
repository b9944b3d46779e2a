//! DHCP server dispatch
//!
//! [`Server`] owns the listening socket. Each decoded BOOTREQUEST is handed
//! to a [`Handler`] on a blocking worker together with a [`ResponseWriter`]
//! bound to that request; replies are funnelled through a single writer task
//! that owns the sending side of the socket.

pub mod mux;
pub mod writer;

use crate::{
    config::{DecodeFailurePolicy, ServerConfig},
    error::DhcpError,
    network,
    v4::{Message, OpCode, OptionRegistry},
};
use std::{
    future::{self, Future},
    net::SocketAddr,
    sync::Arc,
};
use tokio::{
    net::UdpSocket,
    sync::{
        mpsc::{self, UnboundedReceiver},
        Semaphore,
    },
};

pub use mux::{MuxHandler, ServerMux};
pub use writer::{AckWriter, OfferWriter, ResponseWriter};

use writer::Outgoing;

const MAX_DATAGRAM_LEN: usize = 2048;
const MAX_IN_FLIGHT_LIMIT: usize = 1 << 16;

/// Processes one request. Runs on a blocking worker.
pub trait Handler: Send + Sync + 'static {
    fn serve_dhcp(&self, request: &Message, writer: &ResponseWriter);
}

impl<F> Handler for F
where
    F: Fn(&Message, &ResponseWriter) + Send + Sync + 'static,
{
    fn serve_dhcp(&self, request: &Message, writer: &ResponseWriter) {
        self(request, writer)
    }
}

pub struct Server {
    config: ServerConfig,
    socket: Arc<UdpSocket>,
    registry: Arc<OptionRegistry>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, DhcpError> {
        let socket =
            network::new_udp_socket(config.listen_address, config.interface.as_deref())?;

        tracing::info!("DHCP server listening on {}", socket.local_addr()?);

        Ok(Self {
            config,
            socket: Arc::new(socket),
            registry: Arc::new(OptionRegistry::new()),
        })
    }

    /// Replaces the registry used to decode requests.
    pub fn with_registry(mut self, registry: OptionRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DhcpError> {
        Ok(self.socket.local_addr()?)
    }

    /// Serves requests until the socket fails.
    pub async fn serve<H: Handler>(self, handler: H) -> Result<(), DhcpError> {
        self.serve_with_shutdown(handler, future::pending()).await
    }

    /// Serves requests until `shutdown` resolves or the socket fails.
    ///
    /// Before returning, waits for running handlers to finish and for their
    /// replies to be written.
    pub async fn serve_with_shutdown<H, F>(self, handler: H, shutdown: F) -> Result<(), DhcpError>
    where
        H: Handler,
        F: Future<Output = ()>,
    {
        let handler = Arc::new(handler);
        let limit = self.config.max_in_flight.clamp(1, MAX_IN_FLIGHT_LIMIT);
        let permits = Arc::new(Semaphore::new(limit));
        let (outgoing, replies) = mpsc::unbounded_channel();
        let reply_task = tokio::spawn(write_replies(Arc::clone(&self.socket), replies));

        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        tokio::pin!(shutdown);

        let result = loop {
            let (len, source) = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, no longer accepting requests");
                    break Ok(());
                }
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok(received) => received,
                    Err(e) => {
                        tracing::error!("Socket receive error: {}", e);
                        break Err(DhcpError::Io(e));
                    }
                },
            };

            tracing::debug!("Received {} bytes from {}", len, source);
            let request = match Message::decode_with(&buf[..len], &self.registry) {
                Ok(request) => request,
                Err(e) => match self.config.decode_failure {
                    DecodeFailurePolicy::Drop => {
                        tracing::warn!("Dropping malformed datagram from {}: {}", source, e);
                        continue;
                    }
                    DecodeFailurePolicy::Abort => {
                        tracing::error!("Malformed datagram from {}: {}", source, e);
                        break Err(DhcpError::MalformedMessage(e));
                    }
                },
            };

            if request.op != OpCode::BootRequest {
                tracing::debug!("Discarding {} from {}", request.op, source);
                continue;
            }

            let permit = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested while waiting for a free handler");
                    break Ok(());
                }
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break Err(DhcpError::ServerClosed),
                },
            };

            let writer =
                ResponseWriter::new(Arc::new(request), source, &self.config, outgoing.clone());
            let handler = Arc::clone(&handler);
            tokio::task::spawn_blocking(move || {
                handler.serve_dhcp(writer.request(), &writer);
                drop(writer);
                drop(permit);
            });
        };

        // Every permit back means every handler has dropped its writer.
        if let Ok(all) = permits.acquire_many(limit as u32).await {
            all.forget();
        }
        drop(outgoing);
        if let Err(e) = reply_task.await {
            tracing::error!("Reply writer task failed: {}", e);
        }

        tracing::info!("DHCP server stopped");
        result
    }
}

async fn write_replies(socket: Arc<UdpSocket>, mut replies: UnboundedReceiver<Outgoing>) {
    while let Some(reply) = replies.recv().await {
        match socket.send_to(&reply.packet, reply.target).await {
            Ok(sent) => tracing::debug!("Sent {} bytes to {}", sent, reply.target),
            Err(e) => tracing::error!("Failed to send reply to {}: {}", reply.target, e),
        }
    }
}
