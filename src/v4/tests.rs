use super::*;
use crate::v4::options::code;
use bytes::Bytes;
use macaddr::MacAddr6;
use std::net::Ipv4Addr;

fn mac() -> MacAddr6 {
    MacAddr6::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff)
}

fn discover_from_mac() -> Message {
    let mut msg = new_discover();
    msg.set_mac_address(mac());
    msg.giaddr = Ipv4Addr::new(10, 1, 0, 1);
    msg.set_broadcast(true);
    msg
}

#[test]
fn test_boot_request_defaults() {
    let msg = new_boot_request();

    assert_eq!(msg.op, OpCode::BootRequest);
    assert_eq!(msg.htype, 1);
    assert_eq!(msg.hlen, 6);
    assert_eq!(msg.ciaddr, Ipv4Addr::UNSPECIFIED);
    assert_eq!(msg.yiaddr, Ipv4Addr::UNSPECIFIED);
    assert_eq!(msg.siaddr, Ipv4Addr::UNSPECIFIED);
    assert_eq!(msg.giaddr, Ipv4Addr::UNSPECIFIED);
    assert_eq!(msg.magic_cookie, MAGIC_COOKIE);
    assert_eq!(msg.options().count(), 0);
}

#[test]
fn test_boot_reply_echoes_request_fields() {
    let request = discover_from_mac();
    let reply = new_boot_reply(&request);

    assert_eq!(reply.op, OpCode::BootReply);
    assert_eq!(reply.xid, request.xid);
    assert_eq!(reply.giaddr, request.giaddr);
    assert_eq!(reply.chaddr, request.chaddr);
    assert_eq!(reply.htype, request.htype);
    assert_eq!(reply.hlen, request.hlen);
    assert!(reply.is_broadcast());
    assert_eq!(reply.options().count(), 0);
}

#[test]
fn test_reply_xid_matches_for_many_requests() {
    for _ in 0..32 {
        let request = new_boot_request();
        assert_eq!(new_boot_reply(&request).xid, request.xid);
    }
}

#[test]
fn test_build_discover() {
    let msg = discover_from_mac();
    let decoded = Message::decode(&msg.encode().unwrap()).unwrap();

    assert_eq!(decoded.op, OpCode::BootRequest);
    assert_eq!(decoded.xid, msg.xid);
    assert_eq!(decoded.mac_address(), "aa:bb:cc:dd:ee:ff");
    assert_eq!(decoded.message_type(), Some(MessageType::Discover));
}

#[test]
fn test_build_offer() {
    let discover = discover_from_mac();
    let offer = new_offer(&discover, Ipv4Addr::new(192, 168, 2, 233));

    assert_eq!(offer.op, OpCode::BootReply);
    assert_eq!(offer.xid, discover.xid);
    assert_eq!(offer.yiaddr, Ipv4Addr::new(192, 168, 2, 233));
    assert_eq!(offer.message_type(), Some(MessageType::Offer));
    assert_eq!(offer.lease_time(), Some(DEFAULT_LEASE_TIME));
    assert!(offer.option(code::CLIENT_IDENTIFIER).is_none());
}

#[test]
fn test_build_ack() {
    let request = new_request();
    let ack = new_ack(&request, Ipv4Addr::new(10, 0, 0, 9));

    assert_eq!(ack.xid, request.xid);
    assert_eq!(ack.yiaddr, Ipv4Addr::new(10, 0, 0, 9));
    assert_eq!(ack.message_type(), Some(MessageType::Ack));
    assert_eq!(ack.lease_time(), Some(DEFAULT_LEASE_TIME));
}

#[test]
fn test_nak_never_carries_lease_parameters() {
    let mut request = new_request();
    request.set_option(DhcpOption::LeaseTime(600));
    request.set_option(DhcpOption::ParameterRequestList(vec![1, 3, 51]));

    let nak = new_nak(&request, "address not available");

    assert_eq!(nak.message_type(), Some(MessageType::Nak));
    assert_eq!(nak.text_message(), Some("address not available"));
    assert_eq!(nak.xid, request.xid);
    assert!(nak.lease_time().is_none());
    assert!(nak.option(code::PARAMETER_REQUEST_LIST).is_none());
    assert_eq!(nak.yiaddr, Ipv4Addr::UNSPECIFIED);
}

#[test]
fn test_build_decline() {
    let msg = new_decline(Ipv4Addr::new(10, 0, 0, 9), Some(Ipv4Addr::new(10, 0, 0, 1)));

    assert_eq!(msg.message_type(), Some(MessageType::Decline));
    assert_eq!(msg.requested_ip(), Some(Ipv4Addr::new(10, 0, 0, 9)));
    assert_eq!(msg.server_identifier(), Some(Ipv4Addr::new(10, 0, 0, 1)));
    assert_eq!(msg.ciaddr, Ipv4Addr::UNSPECIFIED);

    let anonymous = new_decline(Ipv4Addr::new(10, 0, 0, 9), None);
    assert!(anonymous.server_identifier().is_none());
}

#[test]
fn test_build_renew_release_inform() {
    let client_ip = Ipv4Addr::new(192, 168, 1, 100);

    let renew = new_renew(client_ip);
    assert_eq!(renew.message_type(), Some(MessageType::Request));
    assert_eq!(renew.ciaddr, client_ip);
    assert!(renew.requested_ip().is_none());

    let release = new_release(client_ip);
    assert_eq!(release.message_type(), Some(MessageType::Release));
    assert_eq!(release.ciaddr, client_ip);
    assert!(release.requested_ip().is_none());

    let inform = new_inform(client_ip);
    assert_eq!(inform.message_type(), Some(MessageType::Inform));
    assert_eq!(inform.ciaddr, client_ip);
}

#[test]
fn test_message_with_every_option_round_trips() {
    let mut msg = new_offer(&discover_from_mac(), Ipv4Addr::new(192, 168, 2, 233));
    msg.hops = 2;
    msg.secs = 12;
    msg.ciaddr = Ipv4Addr::new(192, 168, 2, 10);
    msg.siaddr = Ipv4Addr::new(192, 168, 2, 1);
    msg.set_server_name("boot-server");
    msg.set_boot_file("pxelinux.0");
    msg.extend_options([
        DhcpOption::SubnetMask(Ipv4Addr::new(255, 255, 255, 0)),
        DhcpOption::Router(vec![Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 254)]),
        DhcpOption::DomainNameServer(vec![Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(8, 8, 4, 4)]),
        DhcpOption::HostName("x".to_string()),
        DhcpOption::DomainName("lan".to_string()),
        DhcpOption::BroadcastAddress(Ipv4Addr::new(192, 168, 2, 255)),
        DhcpOption::RequestedIpAddress(Ipv4Addr::new(192, 168, 2, 233)),
        DhcpOption::LeaseTime(86400),
        DhcpOption::ServerIdentifier(Ipv4Addr::new(192, 168, 2, 1)),
        DhcpOption::ParameterRequestList(vec![1, 3, 6, 15]),
        DhcpOption::Message("hello".to_string()),
        DhcpOption::MaximumMessageSize(1500),
        DhcpOption::RenewalTime(43200),
        DhcpOption::RebindingTime(75600),
        DhcpOption::client_identifier_from_mac([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]),
        DhcpOption::Ipv6OnlyPreferred(300),
        DhcpOption::CapwapAcV4(vec![Ipv4Addr::new(192, 0, 2, 1)]),
        DhcpOption::Raw {
            code: 200,
            data: vec![0xde, 0xad],
        },
    ]);

    let decoded = Message::decode(&msg.encode().unwrap()).unwrap();
    assert_eq!(decoded, msg);
    assert_eq!(decoded.options().count(), 19);
}

#[test]
fn test_chaddr_beyond_hlen_is_zero_after_round_trip() {
    let mut msg = new_discover();
    msg.hlen = 6;
    msg.chaddr = Bytes::from_static(&[1, 2, 3, 4, 5, 6]);

    let bytes = msg.encode().unwrap();
    assert_eq!(&bytes[28..44], &[1, 2, 3, 4, 5, 6, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(Message::decode(&bytes).unwrap().chaddr, msg.chaddr);
}

#[test]
fn test_message_display_lists_options() {
    let offer = new_offer(&discover_from_mac(), Ipv4Addr::new(192, 168, 2, 233));
    let text = offer.to_string();

    assert!(text.contains("OpCode: BOOTREPLY"));
    assert!(text.contains("YourIPAddr: 192.168.2.233"));
    assert!(text.contains("ClientHardwareAddr: aa:bb:cc:dd:ee:ff"));
    assert!(text.contains("DHCP Message Type (53): DHCPOFFER"));
}
