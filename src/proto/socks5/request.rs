use super::{consts, Address, Command};
use crate::{
    auth::AuthMethod,
    error::InvalidField,
    io::WireRead,
};
use anyhow::{ensure, Result};
use log::debug;
use std::collections::HashSet;
use tokio::io::AsyncReadExt;

// The client connects to the server, and sends a
// version identifier/method selection message:
// +----+----------+----------+
// |VER | NMETHODS | METHODS  |
// +----+----------+----------+
// | 1  |    1     | 1 to 255 |
// +----+----------+----------+

#[derive(Debug)]
pub struct HandshakeRequest {
    auth_methods: HashSet<AuthMethod>,
}

impl HandshakeRequest {
    #[cfg(test)]
    pub fn new(auth_methods: HashSet<AuthMethod>) -> HandshakeRequest {
        HandshakeRequest { auth_methods }
    }

    pub fn auth_methods(&self) -> &HashSet<AuthMethod> {
        &self.auth_methods
    }
}

impl WireRead for HandshakeRequest {
    async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Self> {
        let mut header: [u8; 2] = [0, 0];
        stream.read_exact(&mut header).await?;

        let (version, nmethods) = (header[0], header[1]);
        ensure!(version == consts::SOCKS5_VERSION, InvalidField::ProtocolVersion(version));

        let auth_methods = match nmethods {
            0 => HashSet::new(),
            n => {
                let mut methods = vec![0u8; n.into()];
                stream.read_exact(&mut methods).await?;

                // Methods the client offers that we don't implement are not
                // a protocol error - they're simply not eligible for selection.
                methods
                    .iter()
                    .filter_map(|&m| match AuthMethod::from_wire(m) {
                        Ok(method) => Some(method),
                        Err(_) => {
                            debug!("client offered unsupported auth method {m:#04x}");
                            None
                        }
                    })
                    .collect()
            }
        };

        Ok(HandshakeRequest { auth_methods })
    }
}

// The SOCKS request information is sent by the client as
// soon as it has established a connection to the SOCKS
// server, and completed the authentication negotiations.
// +----+-----+-------+------+----------+----------+
// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
// +----+-----+-------+------+----------+----------+
// | 1  |  1  | X'00' |  1   | Variable |    2     |
// +----+-----+-------+------+----------+----------+

#[derive(Debug)]
pub struct RelayRequest {
    command: Command,
    target_addr: Address,
}

impl RelayRequest {
    #[cfg(test)]
    pub fn new(command: Command, target_addr: Address) -> RelayRequest {
        RelayRequest { command, target_addr }
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn target_addr(&self) -> &Address {
        &self.target_addr
    }
}

impl WireRead for RelayRequest {
    async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<RelayRequest> {
        let mut buf: [u8; 3] = [0, 0, 0];
        stream.read_exact(&mut buf).await?;

        let (version, cmd, reserved) = (buf[0], buf[1], buf[2]);
        ensure!(version == consts::SOCKS5_VERSION, InvalidField::ProtocolVersion(version));
        ensure!(reserved == 0x00, InvalidField::Reserved(reserved));

        let command = Command::try_from(cmd)?;
        let target_addr = Address::read_from(stream).await?;

        Ok(RelayRequest { command, target_addr })
    }
}
