use crate::{
    auth::Authenticator,
    config::Config,
    error::ProtocolError,
    io::{stream::FramedStream, FramedRead, FramedWrite},
    metrics::Metrics,
    net::tcp::TcpConnection,
    proto::socks5::{
        request::{HandshakeRequest, RelayRequest},
        response::HandshakeResponse,
        Command,
    },
    server::relay,
};
use anyhow::{anyhow, bail, Result};
use log::debug;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpStream, time::timeout};

/// Drives one accepted TCP connection through the handshake, auth, and
/// request stages, then hands off to the relay engine matching the
/// requested command.
pub async fn handle(conn: TcpConnection, authenticator: Arc<Authenticator>, config: Arc<Config>, metrics: Arc<Metrics>) -> Result<()> {
    let peer_addr = conn.peer_addr();
    let local_addr = conn.local_addr();
    let mut stream = FramedStream::new(conn.into_stream());

    negotiate_auth(&mut stream, &authenticator, &config, peer_addr).await?;

    let request = timeout(config.idle_timeout(), stream.read_message::<RelayRequest>())
        .await
        .map_err(|_| anyhow!(std::io::Error::from(std::io::ErrorKind::TimedOut)))??;

    dispatch(stream.into_inner(), request, peer_addr, local_addr, &config, &metrics).await
}

async fn negotiate_auth(stream: &mut FramedStream<TcpStream>, authenticator: &Authenticator, config: &Config, peer_addr: SocketAddr) -> Result<()> {
    let handshake = timeout(config.idle_timeout(), stream.read_message::<HandshakeRequest>())
        .await
        .map_err(|_| anyhow!(std::io::Error::from(std::io::ErrorKind::TimedOut)))??;

    let selected = authenticator.select_method(handshake.auth_methods());
    stream.write_message(HandshakeResponse::new(selected)).await?;

    let Some(method) = selected else {
        bail!(ProtocolError::NoAcceptableAuthMethod);
    };

    debug!("selected authentication method {method:?} for {peer_addr}");
    timeout(config.idle_timeout(), authenticator.authenticate(method, &mut **stream, &peer_addr))
        .await
        .map_err(|_| anyhow!(std::io::Error::from(std::io::ErrorKind::TimedOut)))?
}

async fn dispatch(stream: TcpStream, request: RelayRequest, peer_addr: SocketAddr, local_addr: SocketAddr, config: &Config, metrics: &Metrics) -> Result<()> {
    match request.command() {
        Command::Connect => relay::connect::run(stream, request, peer_addr, local_addr, config, metrics).await,
        Command::Bind => relay::bind::run(stream, request, peer_addr, local_addr, config, metrics).await,
        Command::UdpAssociate => relay::udp::run(stream, request, peer_addr, local_addr, config, metrics).await,
    }
}
