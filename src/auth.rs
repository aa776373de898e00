use crate::error::{InvalidField, ProtocolError};
use crate::logging;
use anyhow::{bail, Result};
use log::warn;
use std::collections::HashSet;
use std::fmt::Display;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const SOCKS5_AUTH_METHOD_NONE: u8 = 0x00;
const SOCKS5_AUTH_METHOD_PASSWORD: u8 = 0x02;

const USERPASS_VERSION: u8 = 0x01;
const USERPASS_STATUS_SUCCESS: u8 = 0x00;
const USERPASS_STATUS_FAILURE: u8 = 0x01;

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum AuthMethod {
    None,
    Password,
}

impl AuthMethod {
    pub fn from_wire(value: u8) -> Result<AuthMethod> {
        match value {
            SOCKS5_AUTH_METHOD_NONE => Ok(AuthMethod::None),
            SOCKS5_AUTH_METHOD_PASSWORD => Ok(AuthMethod::Password),
            _ => bail!(ProtocolError::Invalid(InvalidField::AuthMethod(value))),
        }
    }

    pub fn as_wire(self) -> u8 {
        match self {
            AuthMethod::None => SOCKS5_AUTH_METHOD_NONE,
            AuthMethod::Password => SOCKS5_AUTH_METHOD_PASSWORD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Credentials {
        Credentials { username, password }
    }
}

/// Picks and runs an authentication method from the ones a client offers
/// in the handshake, against whatever the server was configured with.
pub struct Authenticator {
    credentials: Option<Credentials>,
}

impl Authenticator {
    pub fn new(credentials: Option<Credentials>) -> Authenticator {
        Authenticator { credentials }
    }

    /// Methods this server is willing to negotiate, given how it was configured.
    pub fn available_methods(&self) -> HashSet<AuthMethod> {
        match self.credentials {
            Some(_) => HashSet::from([AuthMethod::Password]),
            None => HashSet::from([AuthMethod::None]),
        }
    }

    /// Picks the first of our available methods that the client also offered.
    pub fn select_method(&self, offered: &HashSet<AuthMethod>) -> Option<AuthMethod> {
        self.available_methods().into_iter().find(|m| offered.contains(m))
    }

    /// Runs the negotiated method's sub-negotiation, if it has one.
    pub async fn authenticate<S, P>(&self, method: AuthMethod, stream: &mut S, peer: &P) -> Result<()>
    where
        S: AsyncReadExt + AsyncWriteExt + Unpin,
        P: Display,
    {
        match method {
            AuthMethod::None => Ok(()),
            AuthMethod::Password => self.authenticate_password(stream, peer).await,
        }
    }

    // RFC 1929: one sub-negotiation message from the client, one status byte back.
    // +----+------+----------+------+----------+
    // |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
    // +----+------+----------+------+----------+
    // | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
    // +----+------+----------+------+----------+
    async fn authenticate_password<S, P>(&self, stream: &mut S, peer: &P) -> Result<()>
    where
        S: AsyncReadExt + AsyncWriteExt + Unpin,
        P: Display,
    {
        let version = stream.read_u8().await?;
        if version != USERPASS_VERSION {
            bail!(ProtocolError::Invalid(InvalidField::ProtocolVersion(version)));
        }

        let ulen = stream.read_u8().await?;
        let mut uname = vec![0u8; ulen as usize];
        stream.read_exact(&mut uname).await?;

        let plen = stream.read_u8().await?;
        let mut passwd = vec![0u8; plen as usize];
        stream.read_exact(&mut passwd).await?;

        let granted = self
            .credentials
            .as_ref()
            .map(|creds| constant_time_eq(creds.username.as_bytes(), &uname) && constant_time_eq(creds.password.as_bytes(), &passwd))
            .unwrap_or(false);

        let status = if granted { USERPASS_STATUS_SUCCESS } else { USERPASS_STATUS_FAILURE };
        stream.write_all(&[USERPASS_VERSION, status]).await?;

        if granted {
            Ok(())
        } else {
            logging::log_auth_failed!(peer, AuthMethod::Password);
            bail!(ProtocolError::AuthenticationFailed)
        }
    }
}

/// Compares two byte slices without branching on the content, only on length.
/// Avoids leaking how many leading bytes of a submitted password happened to match.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
