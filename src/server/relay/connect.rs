use crate::{
    config::Config,
    io::{tunnel::Tunnel, WireWrite},
    logging,
    metrics::Metrics,
    net::tcp,
    proto::socks5::{request::RelayRequest, response::RelayResponse},
};
use anyhow::Result;
use human_bytes::human_bytes;
use log::{error, info};
use std::net::SocketAddr;
use tokio::net::TcpStream;

/// Opens an outbound TCP connection to the requested target and relays
/// bytes in both directions until either side closes.
pub async fn run(mut stream: TcpStream, request: RelayRequest, peer_addr: SocketAddr, local_addr: SocketAddr, config: &Config, metrics: &Metrics) -> Result<()> {
    let target_addr = request.target_addr();

    let resolved = match target_addr.resolve().await {
        Ok(resolved) => resolved,
        Err(err) => return super::fail(&mut stream, err, &request, peer_addr, local_addr).await,
    };

    let mut outbound = match tcp::establish_tcp_connection(resolved).await {
        Ok(outbound) => outbound,
        Err(err) => return super::fail(&mut stream, err, &request, peer_addr, local_addr).await,
    };

    let response = RelayResponse::builder().with_success().with_bound_address(local_addr).build();
    response.write_to(&mut stream).await?;

    logging::log_tunnel_created!(peer_addr, local_addr, target_addr);

    let mut tunnel = Tunnel::new(&mut stream, &mut outbound, config.tcp_buf_size());
    match tunnel.run().await {
        Ok((sent, received)) => {
            metrics.add_relayed_bytes(sent, received);
            logging::log_tunnel_closed!(peer_addr, local_addr, target_addr, sent, received);
            Ok(())
        }
        Err(err) => {
            logging::log_tunnel_closed_with_error!(peer_addr, local_addr, target_addr, err);
            Err(err)
        }
    }
}
