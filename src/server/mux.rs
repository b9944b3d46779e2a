use super::{
    writer::{AckWriter, OfferWriter, ResponseWriter},
    Handler,
};
use crate::v4::{Message, MessageType};

/// Per-message-type callbacks for a DHCP server.
pub trait MuxHandler: Send + Sync + 'static {
    fn handle_discover(&self, request: &Message, writer: &dyn OfferWriter);

    /// A REQUEST from a client without an address (SELECTING or INIT-REBOOT).
    fn handle_request(&self, request: &Message, writer: &dyn AckWriter);

    /// A REQUEST from a client that already holds `ciaddr`.
    fn handle_renew(&self, request: &Message, writer: &dyn AckWriter);

    fn handle_decline(&self, request: &Message, writer: &ResponseWriter);

    fn handle_release(&self, request: &Message, writer: &ResponseWriter);

    /// Ignored unless overridden.
    fn handle_inform(&self, request: &Message, writer: &ResponseWriter) {
        tracing::debug!(
            "Ignoring DHCPINFORM from {} (xid {:#010x})",
            writer.source(),
            request.xid
        );
    }
}

/// Routes requests to a [`MuxHandler`] by message type.
pub struct ServerMux<H> {
    handler: H,
}

impl<H: MuxHandler> ServerMux<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H: MuxHandler> Handler for ServerMux<H> {
    fn serve_dhcp(&self, request: &Message, writer: &ResponseWriter) {
        match request.message_type() {
            Some(MessageType::Discover) => self.handler.handle_discover(request, writer),
            Some(MessageType::Request) if request.ciaddr.is_unspecified() => {
                self.handler.handle_request(request, writer)
            }
            Some(MessageType::Request) => self.handler.handle_renew(request, writer),
            Some(MessageType::Decline) => self.handler.handle_decline(request, writer),
            Some(MessageType::Release) => self.handler.handle_release(request, writer),
            Some(MessageType::Inform) => self.handler.handle_inform(request, writer),
            other => tracing::debug!(
                "No route for message type {:?} from {}, ignoring",
                other,
                writer.source()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ServerConfig, v4};
    use std::{
        net::Ipv4Addr,
        sync::{Arc, Mutex},
    };
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
    }

    impl Recorder {
        fn record(&self, name: &'static str) {
            self.calls.lock().unwrap().push(name);
        }
    }

    impl MuxHandler for Recorder {
        fn handle_discover(&self, _: &Message, _: &dyn OfferWriter) {
            self.record("discover");
        }
        fn handle_request(&self, _: &Message, _: &dyn AckWriter) {
            self.record("request");
        }
        fn handle_renew(&self, _: &Message, _: &dyn AckWriter) {
            self.record("renew");
        }
        fn handle_decline(&self, _: &Message, _: &ResponseWriter) {
            self.record("decline");
        }
        fn handle_release(&self, _: &Message, _: &ResponseWriter) {
            self.record("release");
        }
    }

    fn dispatch(mux: &ServerMux<Recorder>, request: Message) {
        let (tx, _rx) = mpsc::unbounded_channel();
        let writer = ResponseWriter::new(
            Arc::new(request),
            "10.0.0.50:68".parse().unwrap(),
            &ServerConfig::default(),
            tx,
        );
        mux.serve_dhcp(writer.request(), &writer);
    }

    fn calls(mux: &ServerMux<Recorder>) -> Vec<&'static str> {
        mux.handler().calls.lock().unwrap().clone()
    }

    #[test]
    fn test_routes_by_message_type() {
        let mux = ServerMux::new(Recorder::default());
        let client_ip = Ipv4Addr::new(10, 0, 0, 9);

        dispatch(&mux, v4::new_discover());
        dispatch(&mux, v4::new_decline(client_ip, Some(Ipv4Addr::new(10, 0, 0, 1))));
        dispatch(&mux, v4::new_release(client_ip));
        dispatch(&mux, v4::new_inform(client_ip));

        assert_eq!(calls(&mux), vec!["discover", "decline", "release"]);
    }

    #[test]
    fn test_request_without_ciaddr_is_fresh_request() {
        let mux = ServerMux::new(Recorder::default());

        let mut request = v4::new_request();
        request.set_option(v4::DhcpOption::RequestedIpAddress(Ipv4Addr::new(10, 0, 0, 9)));
        dispatch(&mux, request);

        assert_eq!(calls(&mux), vec!["request"]);
    }

    #[test]
    fn test_request_with_ciaddr_is_renew() {
        let mux = ServerMux::new(Recorder::default());

        dispatch(&mux, v4::new_renew(Ipv4Addr::new(10, 0, 0, 9)));

        assert_eq!(calls(&mux), vec!["renew"]);
    }

    #[test]
    fn test_unroutable_messages_are_ignored() {
        let mux = ServerMux::new(Recorder::default());

        let mut offer = v4::new_boot_request();
        offer.set_message_type(MessageType::Offer);
        dispatch(&mux, offer);
        dispatch(&mux, v4::new_boot_request());

        assert!(calls(&mux).is_empty());
    }
}
