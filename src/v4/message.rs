//! DHCPv4 message framing.
//!
//! ```text
//! offset  size  field
//! 0       1     op
//! 1       1     htype
//! 2       1     hlen
//! 3       1     hops
//! 4       4     xid
//! 8       2     secs
//! 10      2     flags
//! 12      4     ciaddr
//! 16      4     yiaddr
//! 20      4     siaddr
//! 24      4     giaddr
//! 28      16    chaddr
//! 44      64    sname
//! 108     128   file
//! 236     4     magic cookie
//! 240..   var   options, terminated by 255
//! ```

use super::{
    options::{code, DhcpOption, MessageType, OptionCode, OptionRegistry},
    CodecError,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use macaddr::MacAddr6;
use std::{collections::BTreeMap, fmt, net::Ipv4Addr};

pub const MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

const HEADER_LEN: usize = 236;
pub const MIN_MESSAGE_LEN: usize = HEADER_LEN + MAGIC_COOKIE.len();

const CHADDR_LEN: usize = 16;
const SNAME_LEN: usize = 64;
const FILE_LEN: usize = 128;

/// Broadcast bit of the `flags` field.
pub const FLAG_BROADCAST: u16 = 0x8000;

pub const HTYPE_ETHERNET: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    BootRequest,
    BootReply,
    Unknown(u8),
}

impl From<u8> for OpCode {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::BootRequest,
            2 => Self::BootReply,
            other => Self::Unknown(other),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(value: OpCode) -> Self {
        match value {
            OpCode::BootRequest => 1,
            OpCode::BootReply => 2,
            OpCode::Unknown(other) => other,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BootRequest => f.write_str("BOOTREQUEST"),
            Self::BootReply => f.write_str("BOOTREPLY"),
            Self::Unknown(value) => write!(f, "UNKNOWN({value})"),
        }
    }
}

/// A single DHCPv4 message.
///
/// Options are kept in a map keyed by code, so each code appears at most
/// once. The map never holds the pad (0) or end (255) codes; both are
/// framing, not options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub op: OpCode,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    /// Significant hardware address bytes; the padding up to 16 bytes is
    /// not stored.
    pub chaddr: Bytes,
    /// Server host name with the trailing NUL padding removed.
    pub sname: Bytes,
    /// Boot file name with the trailing NUL padding removed.
    pub file: Bytes,
    pub magic_cookie: [u8; 4],
    options: BTreeMap<OptionCode, DhcpOption>,
}

impl Message {
    /// An Ethernet message with every address unset and no options.
    pub fn new(op: OpCode, xid: u32) -> Self {
        Self {
            op,
            htype: HTYPE_ETHERNET,
            hlen: 6,
            hops: 0,
            xid,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: Bytes::from_static(&[0; 6]),
            sname: Bytes::new(),
            file: Bytes::new(),
            magic_cookie: MAGIC_COOKIE,
            options: BTreeMap::new(),
        }
    }

    /// Parses a message, decoding options with the standard registry.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        Self::decode_with(data, OptionRegistry::standard())
    }

    pub fn decode_with(data: &[u8], registry: &OptionRegistry) -> Result<Self, CodecError> {
        if data.len() < MIN_MESSAGE_LEN {
            return Err(CodecError::Truncated {
                needed: MIN_MESSAGE_LEN,
                available: data.len(),
            });
        }

        let mut buf = data;
        let op = OpCode::from(buf.get_u8());
        let htype = buf.get_u8();
        let hlen = buf.get_u8();
        if usize::from(hlen) > CHADDR_LEN {
            return Err(CodecError::InvalidHardwareLength(hlen));
        }
        let hops = buf.get_u8();
        let xid = buf.get_u32();
        let secs = buf.get_u16();
        let flags = buf.get_u16();
        let ciaddr = Ipv4Addr::from(buf.get_u32());
        let yiaddr = Ipv4Addr::from(buf.get_u32());
        let siaddr = Ipv4Addr::from(buf.get_u32());
        let giaddr = Ipv4Addr::from(buf.get_u32());
        let chaddr = buf.copy_to_bytes(CHADDR_LEN).slice(..usize::from(hlen));
        let sname = get_padded(&mut buf, SNAME_LEN);
        let file = get_padded(&mut buf, FILE_LEN);
        let mut magic_cookie = [0u8; 4];
        buf.copy_to_slice(&mut magic_cookie);

        let options = decode_options(buf, registry)?;

        Ok(Self {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            sname,
            file,
            magic_cookie,
            options,
        })
    }

    /// Serializes the message, ending the option stream with the end marker.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(MIN_MESSAGE_LEN + 64);
        buf.put_u8(self.op.into());
        buf.put_u8(self.htype);
        buf.put_u8(self.hlen);
        buf.put_u8(self.hops);
        buf.put_u32(self.xid);
        buf.put_u16(self.secs);
        buf.put_u16(self.flags);
        buf.put_slice(&self.ciaddr.octets());
        buf.put_slice(&self.yiaddr.octets());
        buf.put_slice(&self.siaddr.octets());
        buf.put_slice(&self.giaddr.octets());
        put_padded(&mut buf, &self.chaddr, CHADDR_LEN);
        put_padded(&mut buf, &self.sname, SNAME_LEN);
        put_padded(&mut buf, &self.file, FILE_LEN);
        buf.put_slice(&self.magic_cookie);

        for option in self.options.values() {
            option.encode_into(&mut buf)?;
        }
        buf.put_u8(code::END);

        Ok(buf.freeze())
    }

    pub fn has_valid_cookie(&self) -> bool {
        self.magic_cookie == MAGIC_COOKIE
    }

    pub fn options(&self) -> impl Iterator<Item = &DhcpOption> {
        self.options.values()
    }

    pub fn option(&self, code: OptionCode) -> Option<&DhcpOption> {
        self.options.get(&code)
    }

    /// Stores `option` under its code, returning the option it replaced.
    /// Pad and end codes are framing and are never stored.
    pub fn set_option(&mut self, option: DhcpOption) -> Option<DhcpOption> {
        let code = option.code();
        if code == code::PAD || code == code::END {
            tracing::warn!("Ignoring attempt to store reserved option code {}", code);
            return None;
        }
        self.options.insert(code, option)
    }

    pub fn remove_option(&mut self, code: OptionCode) -> Option<DhcpOption> {
        self.options.remove(&code)
    }

    /// Merges options in order; later entries win on code collisions.
    pub fn extend_options(&mut self, options: impl IntoIterator<Item = DhcpOption>) {
        for option in options {
            self.set_option(option);
        }
    }

    pub fn message_type(&self) -> Option<MessageType> {
        match self.option(code::MESSAGE_TYPE) {
            Some(DhcpOption::MessageType(mt)) => Some(*mt),
            _ => None,
        }
    }

    pub fn set_message_type(&mut self, message_type: MessageType) {
        self.set_option(DhcpOption::MessageType(message_type));
    }

    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        match self.option(code::REQUESTED_IP_ADDRESS) {
            Some(DhcpOption::RequestedIpAddress(ip)) => Some(*ip),
            _ => None,
        }
    }

    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        match self.option(code::SERVER_IDENTIFIER) {
            Some(DhcpOption::ServerIdentifier(ip)) => Some(*ip),
            _ => None,
        }
    }

    pub fn lease_time(&self) -> Option<u32> {
        match self.option(code::LEASE_TIME) {
            Some(DhcpOption::LeaseTime(secs)) => Some(*secs),
            _ => None,
        }
    }

    /// `sname` as text, if it is valid UTF-8.
    pub fn server_name(&self) -> Option<&str> {
        std::str::from_utf8(&self.sname).ok()
    }

    pub fn set_server_name(&mut self, name: &str) {
        self.sname = Bytes::copy_from_slice(name.as_bytes());
    }

    /// `file` as text, if it is valid UTF-8.
    pub fn boot_file(&self) -> Option<&str> {
        std::str::from_utf8(&self.file).ok()
    }

    pub fn set_boot_file(&mut self, name: &str) {
        self.file = Bytes::copy_from_slice(name.as_bytes());
    }

    pub fn host_name(&self) -> Option<&str> {
        match self.option(code::HOST_NAME) {
            Some(DhcpOption::HostName(name)) => Some(name),
            _ => None,
        }
    }

    /// Sets the host name option; an empty name leaves the message untouched.
    pub fn set_host_name(&mut self, host_name: &str) {
        if !host_name.is_empty() {
            self.set_option(DhcpOption::HostName(host_name.to_string()));
        }
    }

    pub fn text_message(&self) -> Option<&str> {
        match self.option(code::MESSAGE) {
            Some(DhcpOption::Message(text)) => Some(text),
            _ => None,
        }
    }

    pub fn set_text_message(&mut self, text: &str) {
        self.set_option(DhcpOption::Message(text.to_string()));
    }

    /// Sets htype, hlen and chaddr together.
    pub fn set_hardware_address(&mut self, htype: u8, addr: &[u8]) -> Result<(), CodecError> {
        if addr.len() > CHADDR_LEN {
            return Err(CodecError::InvalidHardwareLength(
                u8::try_from(addr.len()).unwrap_or(u8::MAX),
            ));
        }
        self.htype = htype;
        self.hlen = addr.len() as u8;
        self.chaddr = Bytes::copy_from_slice(addr);
        Ok(())
    }

    pub fn set_mac_address(&mut self, mac: MacAddr6) {
        self.htype = HTYPE_ETHERNET;
        self.hlen = 6;
        self.chaddr = Bytes::copy_from_slice(mac.as_bytes());
    }

    /// Hardware address as colon separated lowercase hex.
    pub fn mac_address(&self) -> String {
        self.chaddr
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn is_broadcast(&self) -> bool {
        self.flags & FLAG_BROADCAST != 0
    }

    pub fn set_broadcast(&mut self, broadcast: bool) {
        if broadcast {
            self.flags |= FLAG_BROADCAST;
        } else {
            self.flags &= !FLAG_BROADCAST;
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DHCP Message:")?;
        writeln!(f, "  OpCode: {}", self.op)?;
        writeln!(f, "  HardwareType: {}", self.htype)?;
        writeln!(f, "  HardwareLength: {}", self.hlen)?;
        writeln!(f, "  Hops: {}", self.hops)?;
        writeln!(f, "  Xid: {:#010x}", self.xid)?;
        writeln!(f, "  Seconds: {}", self.secs)?;
        writeln!(f, "  Flags: {:#06x}", self.flags)?;
        writeln!(f, "  ClientIPAddr: {}", self.ciaddr)?;
        writeln!(f, "  YourIPAddr: {}", self.yiaddr)?;
        writeln!(f, "  ServerIPAddr: {}", self.siaddr)?;
        writeln!(f, "  GatewayIPAddr: {}", self.giaddr)?;
        writeln!(f, "  ClientHardwareAddr: {}", self.mac_address())?;
        writeln!(f, "  ServerHostName: {}", String::from_utf8_lossy(&self.sname))?;
        writeln!(f, "  BootFileName: {}", String::from_utf8_lossy(&self.file))?;
        writeln!(
            f,
            "  MagicCookie: {}",
            self.magic_cookie
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<String>()
        )?;
        writeln!(f, "  Options:")?;
        for option in self.options.values() {
            writeln!(f, "    {option}")?;
        }
        Ok(())
    }
}

fn get_padded(buf: &mut impl Buf, len: usize) -> Bytes {
    let field = buf.copy_to_bytes(len);
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    field.slice(..end)
}

fn put_padded(buf: &mut BytesMut, data: &[u8], width: usize) {
    let len = data.len().min(width);
    buf.put_slice(&data[..len]);
    buf.put_bytes(0, width - len);
}

fn decode_options(
    mut data: &[u8],
    registry: &OptionRegistry,
) -> Result<BTreeMap<OptionCode, DhcpOption>, CodecError> {
    let mut options = BTreeMap::new();

    while let Some((&code, rest)) = data.split_first() {
        data = rest;
        match code {
            code::END => break,
            code::PAD => continue,
            _ => {}
        }

        let Some((&len, rest)) = data.split_first() else {
            return Err(CodecError::Truncated {
                needed: 1,
                available: 0,
            });
        };
        let len = usize::from(len);
        if rest.len() < len {
            return Err(CodecError::Truncated {
                needed: len,
                available: rest.len(),
            });
        }
        let (payload, rest) = rest.split_at(len);
        data = rest;

        let option = registry.decode(code, payload)?;
        if options.insert(code, option).is_some() {
            tracing::debug!("Option {} appeared more than once, keeping the last", code);
        }
    }

    Ok(options)
}
