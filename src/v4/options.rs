//! DHCPv4 options (RFC 2132) and the registry used to decode them.
//!
//! Every option is a `[code][len][payload]` triple on the wire. Known codes
//! decode into a dedicated [`DhcpOption`] variant; anything the registry has
//! no decoder for is kept verbatim as [`DhcpOption::Raw`].

use super::CodecError;
use bytes::{BufMut, BytesMut};
use std::{
    collections::HashMap,
    fmt,
    net::Ipv4Addr,
    sync::OnceLock,
};

pub type OptionCode = u8;

/// Well-known option codes.
pub mod code {
    use super::OptionCode;

    pub const PAD: OptionCode = 0;
    pub const SUBNET_MASK: OptionCode = 1;
    pub const ROUTER: OptionCode = 3;
    pub const DOMAIN_NAME_SERVER: OptionCode = 6;
    pub const HOST_NAME: OptionCode = 12;
    pub const DOMAIN_NAME: OptionCode = 15;
    pub const BROADCAST_ADDRESS: OptionCode = 28;
    pub const REQUESTED_IP_ADDRESS: OptionCode = 50;
    pub const LEASE_TIME: OptionCode = 51;
    pub const MESSAGE_TYPE: OptionCode = 53;
    pub const SERVER_IDENTIFIER: OptionCode = 54;
    pub const PARAMETER_REQUEST_LIST: OptionCode = 55;
    pub const MESSAGE: OptionCode = 56;
    pub const MAXIMUM_MESSAGE_SIZE: OptionCode = 57;
    pub const RENEWAL_TIME: OptionCode = 58;
    pub const REBINDING_TIME: OptionCode = 59;
    pub const CLIENT_IDENTIFIER: OptionCode = 61;
    pub const IPV6_ONLY_PREFERRED: OptionCode = 108;
    pub const CAPWAP_AC_V4: OptionCode = 138;
    pub const END: OptionCode = 255;
}

const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

///
/// DHCP Message Type (option 53).
///
/// Values 1-8 are defined by RFC 2132 section 9.6; the remainder come from
/// RFC 3203, RFC 4388, RFC 6926 and RFC 7724. Values outside the table are
/// kept as `Unknown` so they survive a decode/encode cycle.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
    ForceRenew,
    LeaseQuery,
    LeaseUnassigned,
    LeaseUnknown,
    LeaseActive,
    BulkLeaseQuery,
    LeaseQueryDone,
    ActiveLeaseQuery,
    LeaseQueryStatus,
    Tls,
    Unknown(u8),
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Discover,
            2 => Self::Offer,
            3 => Self::Request,
            4 => Self::Decline,
            5 => Self::Ack,
            6 => Self::Nak,
            7 => Self::Release,
            8 => Self::Inform,
            9 => Self::ForceRenew,
            10 => Self::LeaseQuery,
            11 => Self::LeaseUnassigned,
            12 => Self::LeaseUnknown,
            13 => Self::LeaseActive,
            14 => Self::BulkLeaseQuery,
            15 => Self::LeaseQueryDone,
            16 => Self::ActiveLeaseQuery,
            17 => Self::LeaseQueryStatus,
            18 => Self::Tls,
            other => Self::Unknown(other),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::Discover => 1,
            MessageType::Offer => 2,
            MessageType::Request => 3,
            MessageType::Decline => 4,
            MessageType::Ack => 5,
            MessageType::Nak => 6,
            MessageType::Release => 7,
            MessageType::Inform => 8,
            MessageType::ForceRenew => 9,
            MessageType::LeaseQuery => 10,
            MessageType::LeaseUnassigned => 11,
            MessageType::LeaseUnknown => 12,
            MessageType::LeaseActive => 13,
            MessageType::BulkLeaseQuery => 14,
            MessageType::LeaseQueryDone => 15,
            MessageType::ActiveLeaseQuery => 16,
            MessageType::LeaseQueryStatus => 17,
            MessageType::Tls => 18,
            MessageType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discover => "DHCPDISCOVER",
            Self::Offer => "DHCPOFFER",
            Self::Request => "DHCPREQUEST",
            Self::Decline => "DHCPDECLINE",
            Self::Ack => "DHCPACK",
            Self::Nak => "DHCPNAK",
            Self::Release => "DHCPRELEASE",
            Self::Inform => "DHCPINFORM",
            Self::ForceRenew => "DHCPFORCERENEW",
            Self::LeaseQuery => "DHCPLEASEQUERY",
            Self::LeaseUnassigned => "DHCPLEASEUNASSIGNED",
            Self::LeaseUnknown => "DHCPLEASEUNKNOWN",
            Self::LeaseActive => "DHCPLEASEACTIVE",
            Self::BulkLeaseQuery => "DHCPBULKLEASEQUERY",
            Self::LeaseQueryDone => "DHCPLEASEQUERYDONE",
            Self::ActiveLeaseQuery => "DHCPACTIVELEASEQUERY",
            Self::LeaseQueryStatus => "DHCPLEASEQUERYSTATUS",
            Self::Tls => "DHCPTLS",
            Self::Unknown(value) => return write!(f, "UNKNOWN({value})"),
        };
        f.write_str(name)
    }
}

/// A decoded DHCPv4 option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DhcpOption {
    /// 1: Subnet Mask
    SubnetMask(Ipv4Addr),
    /// 3: Router
    Router(Vec<Ipv4Addr>),
    /// 6: Domain Name Server
    DomainNameServer(Vec<Ipv4Addr>),
    /// 12: Host Name
    HostName(String),
    /// 15: Domain Name
    DomainName(String),
    /// 28: Broadcast Address
    BroadcastAddress(Ipv4Addr),
    /// 50: Requested IP Address
    RequestedIpAddress(Ipv4Addr),
    /// 51: IP Address Lease Time, in seconds
    LeaseTime(u32),
    /// 53: DHCP Message Type
    MessageType(MessageType),
    /// 54: Server Identifier
    ServerIdentifier(Ipv4Addr),
    /// 55: Parameter Request List
    ParameterRequestList(Vec<OptionCode>),
    /// 56: Message
    Message(String),
    /// 57: Maximum DHCP Message Size
    MaximumMessageSize(u16),
    /// 58: Renewal (T1) Time Value, in seconds
    RenewalTime(u32),
    /// 59: Rebinding (T2) Time Value, in seconds
    RebindingTime(u32),
    /// 61: Client-identifier, a type byte followed by the identifier
    ClientIdentifier { kind: u8, id: Vec<u8> },
    /// 108: IPv6-Only Preferred (RFC 8925), V6ONLY_WAIT in seconds
    Ipv6OnlyPreferred(u32),
    /// 138: CAPWAP Access Controller addresses (RFC 5417)
    CapwapAcV4(Vec<Ipv4Addr>),
    /// Any option without a registered decoder
    Raw { code: OptionCode, data: Vec<u8> },
}

impl DhcpOption {
    /// Client identifier made of hardware type 1 (Ethernet) and a MAC address.
    pub fn client_identifier_from_mac(mac: [u8; 6]) -> Self {
        Self::ClientIdentifier {
            kind: 1,
            id: mac.to_vec(),
        }
    }

    pub fn code(&self) -> OptionCode {
        match self {
            Self::SubnetMask(_) => code::SUBNET_MASK,
            Self::Router(_) => code::ROUTER,
            Self::DomainNameServer(_) => code::DOMAIN_NAME_SERVER,
            Self::HostName(_) => code::HOST_NAME,
            Self::DomainName(_) => code::DOMAIN_NAME,
            Self::BroadcastAddress(_) => code::BROADCAST_ADDRESS,
            Self::RequestedIpAddress(_) => code::REQUESTED_IP_ADDRESS,
            Self::LeaseTime(_) => code::LEASE_TIME,
            Self::MessageType(_) => code::MESSAGE_TYPE,
            Self::ServerIdentifier(_) => code::SERVER_IDENTIFIER,
            Self::ParameterRequestList(_) => code::PARAMETER_REQUEST_LIST,
            Self::Message(_) => code::MESSAGE,
            Self::MaximumMessageSize(_) => code::MAXIMUM_MESSAGE_SIZE,
            Self::RenewalTime(_) => code::RENEWAL_TIME,
            Self::RebindingTime(_) => code::REBINDING_TIME,
            Self::ClientIdentifier { .. } => code::CLIENT_IDENTIFIER,
            Self::Ipv6OnlyPreferred(_) => code::IPV6_ONLY_PREFERRED,
            Self::CapwapAcV4(_) => code::CAPWAP_AC_V4,
            Self::Raw { code, .. } => *code,
        }
    }

    /// Human readable option name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubnetMask(_) => "Subnet Mask",
            Self::Router(_) => "Router",
            Self::DomainNameServer(_) => "Domain Name Server",
            Self::HostName(_) => "Host Name",
            Self::DomainName(_) => "Domain Name",
            Self::BroadcastAddress(_) => "Broadcast Address",
            Self::RequestedIpAddress(_) => "Requested IP Address",
            Self::LeaseTime(_) => "IP Address Lease Time",
            Self::MessageType(_) => "DHCP Message Type",
            Self::ServerIdentifier(_) => "Server Identifier",
            Self::ParameterRequestList(_) => "Parameter Request List",
            Self::Message(_) => "Message",
            Self::MaximumMessageSize(_) => "Maximum DHCP Message Size",
            Self::RenewalTime(_) => "Renewal (T1) Time",
            Self::RebindingTime(_) => "Rebinding (T2) Time",
            Self::ClientIdentifier { .. } => "Client Identifier",
            Self::Ipv6OnlyPreferred(_) => "IPv6-Only Preferred",
            Self::CapwapAcV4(_) => "CAPWAP AC IPv4 Address",
            Self::Raw { .. } => "Unrecognized",
        }
    }

    /// Encodes the option payload, without code and length bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::SubnetMask(addr)
            | Self::BroadcastAddress(addr)
            | Self::RequestedIpAddress(addr)
            | Self::ServerIdentifier(addr) => addr.octets().to_vec(),
            Self::Router(addrs) | Self::DomainNameServer(addrs) | Self::CapwapAcV4(addrs) => {
                addrs.iter().flat_map(Ipv4Addr::octets).collect()
            }
            Self::HostName(text) | Self::DomainName(text) | Self::Message(text) => {
                text.as_bytes().to_vec()
            }
            Self::LeaseTime(secs)
            | Self::RenewalTime(secs)
            | Self::RebindingTime(secs)
            | Self::Ipv6OnlyPreferred(secs) => secs.to_be_bytes().to_vec(),
            Self::MessageType(mt) => vec![u8::from(*mt)],
            Self::ParameterRequestList(codes) => codes.clone(),
            Self::MaximumMessageSize(size) => size.to_be_bytes().to_vec(),
            Self::ClientIdentifier { kind, id } => {
                let mut data = Vec::with_capacity(1 + id.len());
                data.push(*kind);
                data.extend_from_slice(id);
                data
            }
            Self::Raw { data, .. } => data.clone(),
        }
    }

    /// Writes the full `[code][len][payload]` triple.
    ///
    /// Fails for payloads the built-in decoders would refuse, so anything
    /// written here decodes again.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.check_shape()?;
        let payload = self.encode();
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(CodecError::OptionTooLong {
                code: self.code(),
                len: payload.len(),
            });
        }
        buf.put_u8(self.code());
        buf.put_u8(payload.len() as u8);
        buf.put_slice(&payload);
        Ok(())
    }

    fn check_shape(&self) -> Result<(), CodecError> {
        match self {
            Self::Router(addrs) | Self::DomainNameServer(addrs) | Self::CapwapAcV4(addrs)
                if addrs.is_empty() =>
            {
                Err(CodecError::malformed(self.code(), "address list is empty"))
            }
            Self::ClientIdentifier { id, .. } if id.is_empty() => Err(CodecError::malformed(
                self.code(),
                "identifier after the type byte is empty",
            )),
            _ => Ok(()),
        }
    }

    /// Decodes a payload using the standard registry.
    pub fn decode(code: OptionCode, data: &[u8]) -> Result<Self, CodecError> {
        OptionRegistry::standard().decode(code, data)
    }
}

impl fmt::Display for DhcpOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): ", self.name(), self.code())?;
        match self {
            Self::SubnetMask(addr)
            | Self::BroadcastAddress(addr)
            | Self::RequestedIpAddress(addr)
            | Self::ServerIdentifier(addr) => write!(f, "{addr}"),
            Self::Router(addrs) | Self::DomainNameServer(addrs) | Self::CapwapAcV4(addrs) => {
                let list: Vec<String> = addrs.iter().map(ToString::to_string).collect();
                f.write_str(&list.join(", "))
            }
            Self::HostName(text) | Self::DomainName(text) | Self::Message(text) => {
                write!(f, "{text:?}")
            }
            Self::LeaseTime(secs)
            | Self::RenewalTime(secs)
            | Self::RebindingTime(secs)
            | Self::Ipv6OnlyPreferred(secs) => write!(f, "{secs}s"),
            Self::MessageType(mt) => write!(f, "{mt}"),
            Self::ParameterRequestList(codes) => {
                let list: Vec<String> = codes.iter().map(ToString::to_string).collect();
                f.write_str(&list.join(" "))
            }
            Self::MaximumMessageSize(size) => write!(f, "{size} bytes"),
            Self::ClientIdentifier { kind, id } => {
                write!(f, "type {kind}, {}", hex(id, ":"))
            }
            Self::Raw { data, .. } => write!(f, "{} bytes {}", data.len(), hex(data, "")),
        }
    }
}

fn hex(data: &[u8], separator: &str) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Decodes one option payload. Receives the option code so a single
/// function can serve several codes.
pub type OptionDecoder = fn(OptionCode, &[u8]) -> Result<DhcpOption, CodecError>;

/// Maps option codes to decoders.
///
/// Codes without a registered decoder decode to [`DhcpOption::Raw`], which
/// re-encodes to the exact bytes it was decoded from.
#[derive(Clone, Debug)]
pub struct OptionRegistry {
    decoders: HashMap<OptionCode, OptionDecoder>,
}

impl OptionRegistry {
    const BUILTIN: [OptionCode; 18] = [
        code::SUBNET_MASK,
        code::ROUTER,
        code::DOMAIN_NAME_SERVER,
        code::HOST_NAME,
        code::DOMAIN_NAME,
        code::BROADCAST_ADDRESS,
        code::REQUESTED_IP_ADDRESS,
        code::LEASE_TIME,
        code::MESSAGE_TYPE,
        code::SERVER_IDENTIFIER,
        code::PARAMETER_REQUEST_LIST,
        code::MESSAGE,
        code::MAXIMUM_MESSAGE_SIZE,
        code::RENEWAL_TIME,
        code::REBINDING_TIME,
        code::CLIENT_IDENTIFIER,
        code::IPV6_ONLY_PREFERRED,
        code::CAPWAP_AC_V4,
    ];

    /// A registry with decoders for every built-in option.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for code in Self::BUILTIN {
            registry.register(code, decode_builtin);
        }
        registry
    }

    /// A registry that decodes every option as raw bytes.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Shared, read-only registry with the built-in decoders.
    pub fn standard() -> &'static Self {
        static STANDARD: OnceLock<OptionRegistry> = OnceLock::new();
        STANDARD.get_or_init(Self::new)
    }

    /// Installs a decoder for `code`, returning the one it replaced.
    pub fn register(&mut self, code: OptionCode, decoder: OptionDecoder) -> Option<OptionDecoder> {
        self.decoders.insert(code, decoder)
    }

    pub fn unregister(&mut self, code: OptionCode) -> Option<OptionDecoder> {
        self.decoders.remove(&code)
    }

    pub fn is_registered(&self, code: OptionCode) -> bool {
        self.decoders.contains_key(&code)
    }

    /// Decodes one payload.
    ///
    /// A decoder must return an option carrying the code it was registered
    /// for; anything else is kept as [`DhcpOption::Raw`] under `code`.
    pub fn decode(&self, code: OptionCode, data: &[u8]) -> Result<DhcpOption, CodecError> {
        let raw = || DhcpOption::Raw {
            code,
            data: data.to_vec(),
        };
        let Some(decoder) = self.decoders.get(&code) else {
            return Ok(raw());
        };

        let option = decoder(code, data)?;
        if option.code() != code {
            tracing::warn!(
                "Decoder for option {} produced option {}, keeping raw bytes",
                code,
                option.code()
            );
            return Ok(raw());
        }
        Ok(option)
    }
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_builtin(code: OptionCode, data: &[u8]) -> Result<DhcpOption, CodecError> {
    let option = match code {
        code::SUBNET_MASK => DhcpOption::SubnetMask(ipv4(code, data)?),
        code::ROUTER => DhcpOption::Router(ipv4_list(code, data)?),
        code::DOMAIN_NAME_SERVER => DhcpOption::DomainNameServer(ipv4_list(code, data)?),
        code::HOST_NAME | code::DOMAIN_NAME | code::MESSAGE => {
            let Ok(text) = std::str::from_utf8(data) else {
                return Ok(DhcpOption::Raw {
                    code,
                    data: data.to_vec(),
                });
            };
            match code {
                code::HOST_NAME => DhcpOption::HostName(text.to_string()),
                code::DOMAIN_NAME => DhcpOption::DomainName(text.to_string()),
                _ => DhcpOption::Message(text.to_string()),
            }
        }
        code::BROADCAST_ADDRESS => DhcpOption::BroadcastAddress(ipv4(code, data)?),
        code::REQUESTED_IP_ADDRESS => DhcpOption::RequestedIpAddress(ipv4(code, data)?),
        code::LEASE_TIME => DhcpOption::LeaseTime(u32::from_be_bytes(array(code, data)?)),
        code::MESSAGE_TYPE => {
            let [value] = array(code, data)?;
            DhcpOption::MessageType(MessageType::from(value))
        }
        code::SERVER_IDENTIFIER => DhcpOption::ServerIdentifier(ipv4(code, data)?),
        code::PARAMETER_REQUEST_LIST => DhcpOption::ParameterRequestList(data.to_vec()),
        code::MAXIMUM_MESSAGE_SIZE => {
            DhcpOption::MaximumMessageSize(u16::from_be_bytes(array(code, data)?))
        }
        code::RENEWAL_TIME => DhcpOption::RenewalTime(u32::from_be_bytes(array(code, data)?)),
        code::REBINDING_TIME => DhcpOption::RebindingTime(u32::from_be_bytes(array(code, data)?)),
        code::CLIENT_IDENTIFIER => match data {
            [kind, id @ ..] if !id.is_empty() => DhcpOption::ClientIdentifier {
                kind: *kind,
                id: id.to_vec(),
            },
            _ => {
                return Err(CodecError::malformed(
                    code,
                    format!("expected at least 2 bytes, got {}", data.len()),
                ))
            }
        },
        code::IPV6_ONLY_PREFERRED => {
            DhcpOption::Ipv6OnlyPreferred(u32::from_be_bytes(array(code, data)?))
        }
        code::CAPWAP_AC_V4 => DhcpOption::CapwapAcV4(ipv4_list(code, data)?),
        _ => DhcpOption::Raw {
            code,
            data: data.to_vec(),
        },
    };
    Ok(option)
}

fn array<const N: usize>(code: OptionCode, data: &[u8]) -> Result<[u8; N], CodecError> {
    data.try_into().map_err(|_| {
        CodecError::malformed(code, format!("expected {N} bytes, got {}", data.len()))
    })
}

fn ipv4(code: OptionCode, data: &[u8]) -> Result<Ipv4Addr, CodecError> {
    array::<4>(code, data).map(Ipv4Addr::from)
}

fn ipv4_list(code: OptionCode, data: &[u8]) -> Result<Vec<Ipv4Addr>, CodecError> {
    if data.is_empty() || data.len() % 4 != 0 {
        return Err(CodecError::malformed(
            code,
            format!("address list length {} is not a positive multiple of 4", data.len()),
        ));
    }
    Ok(data
        .chunks_exact(4)
        .map(|chunk| Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(option: DhcpOption) {
        let decoded = DhcpOption::decode(option.code(), &option.encode()).unwrap();
        assert_eq!(decoded, option);
    }

    #[test]
    fn test_builtin_options_round_trip() {
        round_trip(DhcpOption::SubnetMask(Ipv4Addr::new(255, 255, 255, 0)));
        round_trip(DhcpOption::Router(vec![
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 254),
        ]));
        round_trip(DhcpOption::DomainNameServer(vec![Ipv4Addr::new(1, 1, 1, 1)]));
        round_trip(DhcpOption::HostName("x".to_string()));
        round_trip(DhcpOption::DomainName("example.org".to_string()));
        round_trip(DhcpOption::BroadcastAddress(Ipv4Addr::new(10, 0, 0, 255)));
        round_trip(DhcpOption::RequestedIpAddress(Ipv4Addr::new(10, 0, 0, 7)));
        round_trip(DhcpOption::LeaseTime(86400));
        round_trip(DhcpOption::MessageType(MessageType::Inform));
        round_trip(DhcpOption::ServerIdentifier(Ipv4Addr::new(10, 0, 0, 1)));
        round_trip(DhcpOption::ParameterRequestList(vec![1, 3, 6, 15]));
        round_trip(DhcpOption::Message("address in use".to_string()));
        round_trip(DhcpOption::MaximumMessageSize(1500));
        round_trip(DhcpOption::RenewalTime(43200));
        round_trip(DhcpOption::RebindingTime(75600));
        round_trip(DhcpOption::client_identifier_from_mac([
            0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
        ]));
        round_trip(DhcpOption::Ipv6OnlyPreferred(1800));
        round_trip(DhcpOption::CapwapAcV4(vec![Ipv4Addr::new(192, 0, 2, 10)]));
    }

    #[test]
    fn test_integer_options_are_big_endian() {
        assert_eq!(DhcpOption::LeaseTime(86400).encode(), vec![0x00, 0x01, 0x51, 0x80]);
        assert_eq!(DhcpOption::MaximumMessageSize(576).encode(), vec![0x02, 0x40]);
    }

    #[test]
    fn test_router_list_keeps_order() {
        let option = DhcpOption::Router(vec![
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 254),
        ]);
        assert_eq!(option.encode(), vec![10, 0, 0, 1, 10, 0, 0, 254]);
    }

    #[test]
    fn test_unknown_code_decodes_to_raw() {
        let option = DhcpOption::decode(200, &[0xde, 0xad]).unwrap();
        assert_eq!(
            option,
            DhcpOption::Raw {
                code: 200,
                data: vec![0xde, 0xad]
            }
        );
        assert_eq!(option.code(), 200);
        assert_eq!(option.encode(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_address_list_with_partial_entry_is_malformed() {
        let err = DhcpOption::decode(code::ROUTER, &[10, 0, 0, 1, 10, 0]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedOption { code: 3, .. }));
    }

    #[test]
    fn test_empty_fixed_size_payload_is_malformed() {
        for code in [
            code::SUBNET_MASK,
            code::REQUESTED_IP_ADDRESS,
            code::LEASE_TIME,
            code::MESSAGE_TYPE,
            code::MAXIMUM_MESSAGE_SIZE,
            code::ROUTER,
        ] {
            let err = DhcpOption::decode(code, &[]).unwrap_err();
            assert!(
                matches!(err, CodecError::MalformedOption { code: c, .. } if c == code),
                "code {code} accepted an empty payload"
            );
        }
    }

    #[test]
    fn test_client_identifier_keeps_any_type_byte() {
        let option = DhcpOption::decode(code::CLIENT_IDENTIFIER, &[0x00, b'i', b'd']).unwrap();
        assert_eq!(
            option,
            DhcpOption::ClientIdentifier {
                kind: 0,
                id: b"id".to_vec()
            }
        );
        assert!(DhcpOption::decode(code::CLIENT_IDENTIFIER, &[0x01]).is_err());
    }

    #[test]
    fn test_unknown_message_type_survives() {
        let option = DhcpOption::decode(code::MESSAGE_TYPE, &[42]).unwrap();
        assert_eq!(option, DhcpOption::MessageType(MessageType::Unknown(42)));
        assert_eq!(option.encode(), vec![42]);
    }

    #[test]
    fn test_oversized_option_is_rejected() {
        let mut buf = BytesMut::new();
        let err = DhcpOption::HostName("h".repeat(256))
            .encode_into(&mut buf)
            .unwrap_err();
        assert_eq!(err, CodecError::OptionTooLong { code: 12, len: 256 });
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_registry_keeps_everything_raw() {
        let registry = OptionRegistry::empty();
        let option = registry.decode(code::LEASE_TIME, &[0, 0, 0, 60]).unwrap();
        assert_eq!(
            option,
            DhcpOption::Raw {
                code: code::LEASE_TIME,
                data: vec![0, 0, 0, 60]
            }
        );
    }

    #[test]
    fn test_custom_decoder_overrides_builtin() {
        fn upper(_: OptionCode, data: &[u8]) -> Result<DhcpOption, CodecError> {
            Ok(DhcpOption::HostName(
                String::from_utf8_lossy(data).to_uppercase(),
            ))
        }

        let mut registry = OptionRegistry::new();
        assert!(registry.register(code::HOST_NAME, upper).is_some());
        let option = registry.decode(code::HOST_NAME, b"abc").unwrap();
        assert_eq!(option, DhcpOption::HostName("ABC".to_string()));

        registry.unregister(code::HOST_NAME);
        assert!(!registry.is_registered(code::HOST_NAME));
    }

    #[test]
    fn test_decoder_returning_other_code_is_kept_raw() {
        fn wrong_code(_: OptionCode, data: &[u8]) -> Result<DhcpOption, CodecError> {
            Ok(DhcpOption::Message(format!("{} bytes", data.len())))
        }

        let mut registry = OptionRegistry::new();
        registry.register(code::HOST_NAME, wrong_code);
        let option = registry.decode(code::HOST_NAME, b"abc").unwrap();

        assert_eq!(option.code(), code::HOST_NAME);
        assert_eq!(
            option,
            DhcpOption::Raw {
                code: code::HOST_NAME,
                data: b"abc".to_vec()
            }
        );
    }

    #[test]
    fn test_empty_address_list_fails_encoding() {
        for option in [
            DhcpOption::Router(vec![]),
            DhcpOption::DomainNameServer(vec![]),
            DhcpOption::CapwapAcV4(vec![]),
            DhcpOption::ClientIdentifier {
                kind: 1,
                id: vec![],
            },
        ] {
            let mut buf = BytesMut::new();
            let err = option.encode_into(&mut buf).unwrap_err();
            assert!(
                matches!(err, CodecError::MalformedOption { code, .. } if code == option.code()),
                "{option:?} encoded"
            );
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_invalid_utf8_text_is_kept_byte_exact() {
        let data = [b'h', 0xff, b'o', b's', b't'];
        for code in [code::HOST_NAME, code::DOMAIN_NAME, code::MESSAGE] {
            let option = DhcpOption::decode(code, &data).unwrap();
            assert_eq!(
                option,
                DhcpOption::Raw {
                    code,
                    data: data.to_vec()
                }
            );
            assert_eq!(option.encode(), data.to_vec());
        }
    }

    #[test]
    fn test_option_description() {
        let option = DhcpOption::LeaseTime(3600);
        assert_eq!(option.to_string(), "IP Address Lease Time (51): 3600s");
        let option = DhcpOption::MessageType(MessageType::Offer);
        assert_eq!(option.to_string(), "DHCP Message Type (53): DHCPOFFER");
    }
}
