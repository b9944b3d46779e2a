//! Canonical DHCPv4 messages for each step of an exchange.
//!
//! Field population follows RFC 2131 section 4.3.1 (server replies, table 3)
//! and section 4.4.1 (client requests, table 5).

use super::{
    message::{Message, OpCode},
    options::{DhcpOption, MessageType},
};
use std::net::Ipv4Addr;

/// Lease time attached to OFFER and ACK unless the caller overrides it.
pub const DEFAULT_LEASE_TIME: u32 = 2_592_000;

/// A BOOTREQUEST with a fresh random transaction id and no options.
pub fn new_boot_request() -> Message {
    Message::new(OpCode::BootRequest, rand::random())
}

/// A BOOTREPLY echoing the fields a server must copy from the request:
/// xid, giaddr, flags and the hardware address.
pub fn new_boot_reply(request: &Message) -> Message {
    let mut reply = Message::new(OpCode::BootReply, request.xid);
    reply.giaddr = request.giaddr;
    reply.flags = request.flags;
    reply.htype = request.htype;
    reply.hlen = request.hlen;
    reply.chaddr = request.chaddr.clone();
    reply
}

pub fn new_discover() -> Message {
    let mut msg = new_boot_request();
    msg.set_message_type(MessageType::Discover);
    msg
}

pub fn new_offer(discover: &Message, offered_ip: Ipv4Addr) -> Message {
    let mut offer = new_boot_reply(discover);
    offer.set_message_type(MessageType::Offer);
    offer.set_option(DhcpOption::LeaseTime(DEFAULT_LEASE_TIME));
    offer.yiaddr = offered_ip;
    offer
}

pub fn new_ack(request: &Message, assigned_ip: Ipv4Addr) -> Message {
    let mut ack = new_boot_reply(request);
    ack.set_message_type(MessageType::Ack);
    ack.set_option(DhcpOption::LeaseTime(DEFAULT_LEASE_TIME));
    ack.yiaddr = assigned_ip;
    ack
}

/// A NAK carrying `reason` as its text message. Never carries a lease time
/// or a parameter request list.
pub fn new_nak(request: &Message, reason: &str) -> Message {
    let mut nak = new_boot_reply(request);
    nak.set_message_type(MessageType::Nak);
    nak.set_text_message(reason);
    nak
}

pub fn new_request() -> Message {
    let mut msg = new_boot_request();
    msg.set_message_type(MessageType::Request);
    msg
}

/// A DECLINE for `requested_ip`, addressed to the server that offered it
/// when that server is known.
pub fn new_decline(requested_ip: Ipv4Addr, server_id: Option<Ipv4Addr>) -> Message {
    let mut msg = new_boot_request();
    msg.set_message_type(MessageType::Decline);
    msg.set_option(DhcpOption::RequestedIpAddress(requested_ip));
    if let Some(server_id) = server_id {
        msg.set_option(DhcpOption::ServerIdentifier(server_id));
    }
    msg
}

/// A REQUEST from a bound client extending its lease. The address travels
/// in ciaddr; the requested IP option must not be present.
pub fn new_renew(client_ip: Ipv4Addr) -> Message {
    let mut msg = new_request();
    msg.ciaddr = client_ip;
    msg
}

/// A RELEASE of `client_ip`. The requested IP option must not be present.
pub fn new_release(client_ip: Ipv4Addr) -> Message {
    let mut msg = new_boot_request();
    msg.set_message_type(MessageType::Release);
    msg.ciaddr = client_ip;
    msg
}

pub fn new_inform(client_ip: Ipv4Addr) -> Message {
    let mut msg = new_boot_request();
    msg.set_message_type(MessageType::Inform);
    msg.ciaddr = client_ip;
    msg
}
