use crate::{
    config::Config,
    io::WireWrite,
    logging,
    metrics::Metrics,
    net::udp::bind_udp_relay_socket,
    proto::socks5::{request::RelayRequest, response::RelayResponse, udp::UdpDatagramHeader, Address},
};
use anyhow::Result;
use human_bytes::human_bytes;
use log::{info, warn};
use std::net::SocketAddr;
use tokio::{io::AsyncReadExt, net::TcpStream};

/// Allocates a UDP relay socket and forwards datagrams between the client
/// and whatever targets it addresses, until the control TCP connection
/// closes or sends anything (RFC 1928 §7 treats either as termination).
pub async fn run(mut stream: TcpStream, request: RelayRequest, peer_addr: SocketAddr, local_addr: SocketAddr, config: &Config, metrics: &Metrics) -> Result<()> {
    let relay_socket = match bind_udp_relay_socket(local_addr.ip()).await {
        Ok(socket) => socket,
        Err(err) => return super::fail(&mut stream, err, &request, peer_addr, local_addr).await,
    };

    let relay_addr = relay_socket.local_addr()?;
    let response = RelayResponse::builder().with_success().with_bound_address(relay_addr).build();
    response.write_to(&mut stream).await?;

    logging::log_udp_associate_created!(peer_addr, relay_addr);
    metrics.on_udp_associate_started();

    let mut client_udp_addr: Option<SocketAddr> = None;
    let mut recv_buf = vec![0u8; config.udp_buf_size()];
    let mut control_buf = [0u8; 1];
    let (mut datagrams, mut bytes) = (0u64, 0u64);

    let result = loop {
        tokio::select! {
            res = relay_socket.recv_from(&mut recv_buf) => {
                let (n, from) = match res {
                    Ok(ok) => ok,
                    Err(err) => break Err(err.into()),
                };

                match client_udp_addr {
                    None => client_udp_addr = Some(from),
                    Some(client_addr) if client_addr == from => {}
                    Some(_) => {
                        on_forward_from_target(&relay_socket, client_udp_addr, &recv_buf[..n], from, relay_addr, &mut datagrams, &mut bytes).await;
                        continue;
                    }
                }

                if let Err(err) = on_client_datagram(&relay_socket, &recv_buf[..n], &mut datagrams, &mut bytes).await {
                    logging::log_udp_datagram_dropped!(relay_addr, from, err);
                }
            }
            res = stream.read(&mut control_buf) => {
                match res {
                    Ok(0) => break Ok(()),
                    Ok(_) => break Ok(()), // any traffic on the control socket also ends the relay
                    Err(err) => break Err(err.into()),
                }
            }
        }
    };

    metrics.on_udp_associate_finished();
    metrics.add_relayed_bytes(0, bytes);
    logging::log_udp_associate_closed!(peer_addr, relay_addr, datagrams, bytes);

    result
}

/// Client -> target leg: parse the header, resolve the destination, forward the payload.
async fn on_client_datagram(relay_socket: &tokio::net::UdpSocket, data: &[u8], datagrams: &mut u64, bytes: &mut u64) -> Result<()> {
    let (header, consumed) = UdpDatagramHeader::read_from(data).await?;
    let target_addr = header.dest_addr().resolve().await?;
    let payload = &data[consumed..];

    relay_socket.send_to(payload, target_addr).await?;
    *datagrams += 1;
    *bytes += payload.len() as u64;

    Ok(())
}

/// Target -> client leg: prepend the header naming the source, forward to the learned client endpoint.
async fn on_forward_from_target(
    relay_socket: &tokio::net::UdpSocket,
    client_udp_addr: Option<SocketAddr>,
    payload: &[u8],
    from: SocketAddr,
    relay_addr: SocketAddr,
    datagrams: &mut u64,
    bytes: &mut u64,
) {
    let Some(client_addr) = client_udp_addr else {
        logging::log_udp_datagram_dropped!(relay_addr, from, "no client UDP endpoint learned yet");
        return;
    };

    let header = UdpDatagramHeader::new(Address::SocketAddress(from));
    let mut datagram = bytes::BytesMut::new();
    header.write_to(&mut datagram);
    datagram.extend_from_slice(payload);

    if relay_socket.send_to(&datagram, client_addr).await.is_ok() {
        *datagrams += 1;
        *bytes += datagram.len() as u64;
    }
}
