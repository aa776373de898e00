use crate::{
    config::Config,
    error::ProtocolError,
    io::{tunnel::Tunnel, WireWrite},
    logging,
    metrics::Metrics,
    net::tcp::TcpListener,
    proto::socks5::{request::RelayRequest, response::RelayResponse},
};
use anyhow::{anyhow, Result};
use human_bytes::human_bytes;
use log::{error, info, warn};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::{net::TcpStream, time::timeout};

/// Listens for one inbound TCP connection on behalf of the client, rejecting
/// any peer that doesn't match the address the client advertised in its
/// request, until `bind_wait_timeout` elapses.
pub async fn run(mut stream: TcpStream, request: RelayRequest, peer_addr: SocketAddr, local_addr: SocketAddr, config: &Config, metrics: &Metrics) -> Result<()> {
    let target_addr = request.target_addr();
    let expected_peer = match target_addr.resolve().await {
        Ok(resolved) => resolved,
        Err(err) => return super::fail(&mut stream, err, &request, peer_addr, local_addr).await,
    };

    let unspecified = match expected_peer.ip() {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    };

    let listener = match TcpListener::bind(SocketAddr::new(unspecified, 0)).await {
        Ok(listener) => listener,
        Err(err) => return super::fail(&mut stream, err, &request, peer_addr, local_addr).await,
    };

    let listening_addr = listener.local_addr();
    logging::log_bind_listening!(peer_addr, listening_addr);

    let first_reply = RelayResponse::builder().with_success().with_bound_address(listening_addr).build();
    first_reply.write_to(&mut stream).await?;

    metrics.on_bind_started();
    let inbound = accept_matching_peer(&listener, expected_peer, config).await;
    metrics.on_bind_finished();

    let mut inbound = match inbound {
        Ok(inbound) => inbound,
        Err(err) => {
            let second_reply = RelayResponse::builder().with_err(&err).with_bound_address(listening_addr).build();
            second_reply.write_to(&mut stream).await?;
            return Err(err);
        }
    };

    let inbound_peer = inbound.peer_addr().expect("accepted socket has a peer address");
    let second_reply = RelayResponse::builder().with_success().with_bound_address(inbound_peer).build();
    second_reply.write_to(&mut stream).await?;

    logging::log_tunnel_created!(peer_addr, listening_addr, inbound_peer);

    let mut tunnel = Tunnel::new(&mut stream, &mut inbound, config.tcp_buf_size());
    match tunnel.run().await {
        Ok((sent, received)) => {
            metrics.add_relayed_bytes(sent, received);
            logging::log_tunnel_closed!(peer_addr, listening_addr, inbound_peer, sent, received);
            Ok(())
        }
        Err(err) => {
            logging::log_tunnel_closed_with_error!(peer_addr, listening_addr, inbound_peer, err);
            Err(err)
        }
    }
}

/// Accepts inbound connections until one arrives from `expected_peer`'s
/// address, dropping any others, or until `bind_wait_timeout` elapses.
async fn accept_matching_peer(listener: &TcpListener, expected_peer: SocketAddr, config: &Config) -> Result<TcpStream> {
    timeout(config.bind_wait_timeout(), async {
        loop {
            let conn = listener.accept().await?;
            if conn.peer_addr() == expected_peer {
                return Ok(conn.into_stream());
            }
            logging::log_bind_peer_mismatch!(expected_peer, conn.peer_addr());
        }
    })
    .await
    .map_err(|_| anyhow!(ProtocolError::BindTimeout))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::socks5::{Address, Command};
    use std::net::{Ipv4Addr, SocketAddrV4};
    use tokio::io::AsyncReadExt;

    fn test_config() -> Config {
        use clap::Parser;
        Config::parse_from(["test", "--bind-wait-timeout-ms", "200"])
    }

    #[tokio::test]
    async fn times_out_waiting_for_matching_peer() {
        let config = test_config();
        let client_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = client_listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(proxy_addr).await.unwrap();
            // first reply
            let mut buf = [0u8; 10];
            stream.read(&mut buf).await.unwrap();
            // second reply after bind-wait timeout
            let mut buf2 = [0u8; 10];
            let n = stream.read(&mut buf2).await.unwrap();
            assert!(n > 0);
        });

        let (proxy_stream, _) = client_listener.accept().await.unwrap();
        let local_addr = proxy_stream.local_addr().unwrap();
        let peer_addr = proxy_stream.peer_addr().unwrap();

        // An address that will never connect, so the wait times out.
        let request = RelayRequest::new(Command::Bind, Address::SocketAddress(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 1), 9))));
        let metrics = Metrics::new();

        let result = run(proxy_stream, request, peer_addr, local_addr, &config, &metrics).await;
        assert!(result.is_err());

        client.await.unwrap();
    }
}
