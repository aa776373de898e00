use anyhow::Result;
use std::net::IpAddr;
use tokio::net::UdpSocket;

/// Binds a UDP socket on an OS-assigned port, on the same address family as
/// `local_ip` (the control connection's local address), for a UDP ASSOCIATE relay.
pub async fn bind_udp_relay_socket(local_ip: IpAddr) -> Result<UdpSocket> {
    let socket = UdpSocket::bind((local_ip, 0)).await?;
    Ok(socket)
}
