use crate::{io::WireWrite, logging, proto::socks5::{request::RelayRequest, response::RelayResponse}};
use anyhow::Result;
use log::error;
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;

pub mod bind;
pub mod connect;
pub mod udp;

/// Replies to the client with the reply code mapped from `err`, bound to
/// `local_addr`, then propagates the error to close the connection.
pub(super) async fn fail<S: AsyncWriteExt + Unpin>(
    stream: &mut S,
    err: anyhow::Error,
    request: &RelayRequest,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
) -> Result<()> {
    let response = RelayResponse::builder().with_err(&err).with_bound_address(local_addr).build();

    logging::log_request_handling_error!(peer_addr, err, request, response);
    response.write_to(stream).await?;

    Err(err)
}
