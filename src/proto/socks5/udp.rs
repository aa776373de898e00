//! Wire format for the datagrams exchanged over a UDP ASSOCIATE relay.
//!
//! +----+------+------+----------+----------+----------+
//! |RSV | FRAG | ATYP | DST.ADDR | DST.PORT |   DATA   |
//! +----+------+------+----------+----------+----------+
//! | 2  |  1   |  1   | Variable |    2     | Variable |
//! +----+------+------+----------+----------+----------+

use super::Address;
use crate::error::{InvalidField, ProtocolError};
use anyhow::{bail, Result};
use bytes::BufMut;
use std::io::Cursor;
use tokio::io::AsyncReadExt;

#[derive(Debug)]
pub struct UdpDatagramHeader {
    dest_addr: Address,
}

impl UdpDatagramHeader {
    pub fn new(dest_addr: Address) -> UdpDatagramHeader {
        UdpDatagramHeader { dest_addr }
    }

    pub fn dest_addr(&self) -> &Address {
        &self.dest_addr
    }

    /// Parses a header off the front of a received datagram, returning the
    /// header and how many bytes of `data` it consumed. Fragmented datagrams
    /// (`FRAG != 0`) are rejected rather than reassembled.
    pub async fn read_from(data: &[u8]) -> Result<(UdpDatagramHeader, usize)> {
        let mut cursor = Cursor::new(data);

        let mut rsv = [0u8; 2];
        cursor.read_exact(&mut rsv).await?;
        if rsv != [0x00, 0x00] {
            bail!(ProtocolError::InvalidDatagram(InvalidField::Reserved(rsv[0])));
        }

        let frag = cursor.read_u8().await?;
        if frag != 0x00 {
            bail!(ProtocolError::InvalidDatagram(InvalidField::Fragment(frag)));
        }

        let dest_addr = Address::read_from(&mut cursor).await.map_err(|err| match err.downcast::<ProtocolError>() {
            Ok(ProtocolError::Invalid(field)) => anyhow::anyhow!(ProtocolError::InvalidDatagram(field)),
            Ok(other) => anyhow::anyhow!(other),
            Err(err) => err,
        })?;

        Ok((UdpDatagramHeader { dest_addr }, cursor.position() as usize))
    }

    pub fn write_to<T: BufMut>(&self, buf: &mut T) {
        buf.put_u16(0x0000);
        buf.put_u8(0x00);
        self.dest_addr.write_to(buf);
    }
}
