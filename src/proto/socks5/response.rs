use super::{consts, Address, ReplyCode};
use crate::{auth::AuthMethod, io::WireWrite};
use anyhow::Result;
use bytes::{BufMut, BytesMut};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;

const SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE: u8 = 0xff;

// The server selects from one of the methods given in METHODS, and
// sends a METHOD selection message:
// +----+--------+
// |VER | METHOD |
// +----+--------+
// | 1  |   1    |
// +----+--------+

#[derive(Debug, PartialEq)]
pub struct HandshakeResponse {
    selected_method: Option<AuthMethod>,
}

impl HandshakeResponse {
    pub fn new(selected_method: Option<AuthMethod>) -> HandshakeResponse {
        HandshakeResponse { selected_method }
    }

    pub fn selected_method(&self) -> Option<AuthMethod> {
        self.selected_method
    }
}

impl WireWrite for HandshakeResponse {
    async fn write_to<T: AsyncWriteExt + Unpin>(&self, stream: &mut T) -> Result<()> {
        let method = self.selected_method.map_or(SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE, AuthMethod::as_wire);
        stream.write_all(&[consts::SOCKS5_VERSION, method]).await?;
        Ok(())
    }
}

// The server evaluates the relay request, and returns a reply formed as follows:
// +----+-----+-------+------+----------+----------+
// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
// +----+-----+-------+------+----------+----------+
// | 1  |  1  | X'00' |  1   | Variable |    2     |
// +----+-----+-------+------+----------+----------+

#[derive(Debug)]
pub struct RelayResponse {
    bound_addr: Address,
    status: ReplyCode,
}

impl RelayResponse {
    pub fn builder() -> RelayResponseBuilder {
        RelayResponseBuilder { bound_addr: None, status: None }
    }
}

impl WireWrite for RelayResponse {
    async fn write_to<T: AsyncWriteExt + Unpin>(&self, stream: &mut T) -> Result<()> {
        let mut bytes = BytesMut::new();
        bytes.put_slice(&[consts::SOCKS5_VERSION, self.status.as_u8(), 0x00]);
        self.bound_addr.write_to(&mut bytes);
        stream.write_all(&bytes).await?;
        Ok(())
    }
}

pub struct RelayResponseBuilder {
    bound_addr: Option<Address>,
    status: Option<ReplyCode>,
}

impl RelayResponseBuilder {
    pub fn with_success(mut self) -> Self {
        self.status = Some(ReplyCode::Succeeded);
        self
    }

    pub fn with_err(mut self, err: &anyhow::Error) -> Self {
        self.status = Some(ReplyCode::from(err));
        self
    }

    pub fn with_bound_address(mut self, bound_addr: SocketAddr) -> Self {
        self.bound_addr = Some(Address::SocketAddress(bound_addr));
        self
    }

    pub fn build(self) -> RelayResponse {
        RelayResponse {
            bound_addr: self.bound_addr.expect("bound address expected"),
            status: self.status.expect("reply status expected"),
        }
    }
}
