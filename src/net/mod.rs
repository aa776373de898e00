use anyhow::{bail, Result};
use std::net::SocketAddr;
use tokio::net::{lookup_host, ToSocketAddrs};

pub mod tcp;
pub mod udp;

/// Resolves `addr` to a single concrete `SocketAddr`, taking the first
/// candidate DNS or the system resolver returns.
pub async fn resolve_sockaddr(addr: impl ToSocketAddrs) -> Result<SocketAddr> {
    match lookup_host(addr).await?.next() {
        Some(resolved) => Ok(resolved),
        None => bail!(std::io::Error::from(std::io::ErrorKind::AddrNotAvailable)),
    }
}
