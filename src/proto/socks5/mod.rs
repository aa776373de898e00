//! SOCKS5 protocol implementation details.
//!
//! RFC 1928 - https://datatracker.ietf.org/doc/html/rfc1928
//! RFC 1929 - https://datatracker.ietf.org/doc/html/rfc1929

use crate::error::{InvalidField, ProtocolError};
use crate::net::resolve_sockaddr;
use anyhow::{bail, Result};
use bytes::BufMut;
use std::{
    fmt::{self, Display},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6},
};
use tokio::io::AsyncReadExt;

pub mod request;
pub mod response;
pub mod udp;


#[rustfmt::skip]
pub(crate) mod consts {
    pub const SOCKS5_VERSION: u8 = 0x05;

    pub mod command {
        pub const SOCKS5_CMD_CONNECT: u8 = 0x01;
        pub const SOCKS5_CMD_BIND: u8 = 0x02;
        pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;
    }

    pub mod address {
        pub const SOCKS5_ADDR_TYPE_IPV4: u8 = 0x01;
        pub const SOCKS5_ADDR_TYPE_DOMAIN_NAME: u8 = 0x03;
        pub const SOCKS5_ADDR_TYPE_IPV6: u8 = 0x04;
    }

    pub mod reply {
        pub const SOCKS5_REPLY_SUCCEEDED: u8 = 0x00;
        pub const SOCKS5_REPLY_GENERAL_FAILURE: u8 = 0x01;
        pub const SOCKS5_REPLY_CONNECTION_NOT_ALLOWED: u8 = 0x02;
        pub const SOCKS5_REPLY_NETWORK_UNREACHABLE: u8 = 0x03;
        pub const SOCKS5_REPLY_HOST_UNREACHABLE: u8 = 0x04;
        pub const SOCKS5_REPLY_CONNECTION_REFUSED: u8 = 0x05;
        pub const SOCKS5_REPLY_TTL_EXPIRED: u8 = 0x06;
        pub const SOCKS5_REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;
        pub const SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;
    }
}

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
}

impl TryFrom<u8> for Command {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        use consts::command::*;
        match value {
            SOCKS5_CMD_CONNECT => Ok(Command::Connect),
            SOCKS5_CMD_BIND => Ok(Command::Bind),
            SOCKS5_CMD_UDP_ASSOCIATE => Ok(Command::UdpAssociate),
            _ => bail!(ProtocolError::Invalid(InvalidField::Command(value))),
        }
    }
}

/// A SOCKS5 address: either a literal socket address or a domain name plus
/// port, resolved later by whatever stage needs a concrete `SocketAddr`.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum Address {
    SocketAddress(SocketAddr),
    DomainName(String, u16),
}

impl Address {
    pub async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Address> {
        use consts::address::*;
        let address_type = stream.read_u8().await?;

        match address_type {
            SOCKS5_ADDR_TYPE_IPV4 => Address::read_ipv4(stream).await,
            SOCKS5_ADDR_TYPE_IPV6 => Address::read_ipv6(stream).await,
            SOCKS5_ADDR_TYPE_DOMAIN_NAME => Address::read_domain_name(stream).await,
            _ => bail!(ProtocolError::Invalid(InvalidField::AddressType(address_type))),
        }
    }

    pub fn write_to<T: BufMut>(&self, buf: &mut T) {
        match self {
            Address::SocketAddress(SocketAddr::V4(addr)) => {
                buf.put_u8(consts::address::SOCKS5_ADDR_TYPE_IPV4);
                Address::write_ipv4(buf, addr);
            }
            Address::SocketAddress(SocketAddr::V6(addr)) => {
                buf.put_u8(consts::address::SOCKS5_ADDR_TYPE_IPV6);
                Address::write_ipv6(buf, addr);
            }
            Address::DomainName(name, port) => {
                buf.put_u8(consts::address::SOCKS5_ADDR_TYPE_DOMAIN_NAME);
                Address::write_domain_name(buf, name, *port);
            }
        }
    }

    async fn read_ipv4<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Address> {
        let ip = Ipv4Addr::from(stream.read_u32().await?);
        let port = stream.read_u16().await?;
        Ok(Address::SocketAddress(SocketAddr::V4(SocketAddrV4::new(ip, port))))
    }

    async fn read_ipv6<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Address> {
        let ip = Ipv6Addr::from(stream.read_u128().await?);
        let port = stream.read_u16().await?;
        Ok(Address::SocketAddress(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, 0))))
    }

    async fn read_domain_name<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Address> {
        let len = stream.read_u8().await?;
        let mut buf = vec![0u8; len as usize];
        stream.read_exact(&mut buf).await?;

        let name = String::from_utf8(buf).map_err(ProtocolError::DomainNameDecoding)?;
        let port = stream.read_u16().await?;

        Ok(Address::DomainName(name, port))
    }

    fn write_ipv4<T: BufMut>(buf: &mut T, addr: &SocketAddrV4) {
        buf.put_slice(&addr.ip().octets());
        buf.put_u16(addr.port());
    }

    fn write_ipv6<T: BufMut>(buf: &mut T, addr: &SocketAddrV6) {
        buf.put_slice(&addr.ip().octets());
        buf.put_u16(addr.port());
    }

    fn write_domain_name<T: BufMut>(buf: &mut T, name: &str, port: u16) {
        buf.put_u8(name.len() as u8);
        buf.put_slice(name.as_bytes());
        buf.put_u16(port);
    }

    /// Resolves this address to a concrete `SocketAddr`, looking up domain
    /// names through the system resolver.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        match self {
            Address::SocketAddress(addr) => Ok(*addr),
            Address::DomainName(name, port) => resolve_sockaddr((name.as_str(), *port))
                .await
                .map_err(|_| anyhow::anyhow!(ProtocolError::UnresolvedDomainName(name.clone()))),
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::SocketAddress(sock) => write!(f, "{sock}"),
            Address::DomainName(name, port) => write!(f, "{name}:{port}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyCode {
    Succeeded,
    GeneralFailure,
    ConnectionNotAllowed,
    NetworkUnreachable,
    HostUnreachable,
    ConnectionRefused,
    TtlExpired,
    CommandNotSupported,
    AddressTypeNotSupported,
    OtherReply(u8),
}

impl ReplyCode {
    #[rustfmt::skip]
    pub fn as_u8(self) -> u8 {
        use consts::reply::*;
        match self {
            ReplyCode::Succeeded               => SOCKS5_REPLY_SUCCEEDED,
            ReplyCode::GeneralFailure          => SOCKS5_REPLY_GENERAL_FAILURE,
            ReplyCode::ConnectionNotAllowed    => SOCKS5_REPLY_CONNECTION_NOT_ALLOWED,
            ReplyCode::NetworkUnreachable      => SOCKS5_REPLY_NETWORK_UNREACHABLE,
            ReplyCode::HostUnreachable         => SOCKS5_REPLY_HOST_UNREACHABLE,
            ReplyCode::ConnectionRefused       => SOCKS5_REPLY_CONNECTION_REFUSED,
            ReplyCode::TtlExpired              => SOCKS5_REPLY_TTL_EXPIRED,
            ReplyCode::CommandNotSupported     => SOCKS5_REPLY_COMMAND_NOT_SUPPORTED,
            ReplyCode::AddressTypeNotSupported => SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED,
            ReplyCode::OtherReply(code)        => code,
        }
    }
}

impl Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ReplyCode::Succeeded => write!(f, "succeeded"),
            ReplyCode::GeneralFailure => write!(f, "general failure"),
            ReplyCode::ConnectionNotAllowed => write!(f, "connection not allowed"),
            ReplyCode::NetworkUnreachable => write!(f, "network unreachable"),
            ReplyCode::HostUnreachable => write!(f, "host unreachable"),
            ReplyCode::ConnectionRefused => write!(f, "connection refused"),
            ReplyCode::TtlExpired => write!(f, "TTL expired"),
            ReplyCode::CommandNotSupported => write!(f, "command not supported"),
            ReplyCode::AddressTypeNotSupported => write!(f, "address type not supported"),
            ReplyCode::OtherReply(code) => write!(f, "other reply ({code})"),
        }
    }
}

impl From<&ProtocolError> for ReplyCode {
    fn from(err: &ProtocolError) -> Self {
        match err {
            ProtocolError::UnresolvedDomainName(_) => ReplyCode::HostUnreachable,
            ProtocolError::BindTimeout => ReplyCode::HostUnreachable,
            _ => ReplyCode::GeneralFailure,
        }
    }
}

impl From<&anyhow::Error> for ReplyCode {
    fn from(err: &anyhow::Error) -> Self {
        if let Some(proto_err) = err.downcast_ref::<ProtocolError>() {
            return ReplyCode::from(proto_err);
        }

        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return match io_err.kind() {
                std::io::ErrorKind::ConnectionRefused => ReplyCode::ConnectionRefused,
                std::io::ErrorKind::ConnectionAborted | std::io::ErrorKind::NotConnected => ReplyCode::HostUnreachable,
                std::io::ErrorKind::TimedOut => ReplyCode::TtlExpired,
                _ => ReplyCode::GeneralFailure,
            };
        }

        ReplyCode::GeneralFailure
    }
}
