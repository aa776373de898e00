use anyhow::Result;
use std::fmt::Debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub mod stream;
pub mod tunnel;

pub trait WireRead {
    async fn read_from<T: AsyncReadExt + Unpin>(stream: &mut T) -> Result<Self>
    where
        Self: std::marker::Sized;
}

pub trait WireWrite {
    async fn write_to<T: AsyncWriteExt + Unpin>(&self, stream: &mut T) -> Result<()>;
}

/// Convenience for reading a framed message directly off a connection, with a
/// trace log of what was decoded.
pub trait FramedRead {
    async fn read_message<M>(&mut self) -> Result<M>
    where
        M: WireRead + Debug + 'static;
}

/// Convenience for writing a framed message directly onto a connection, with a
/// trace log of what was encoded.
pub trait FramedWrite {
    async fn write_message<M>(&mut self, message: M) -> Result<()>
    where
        M: WireWrite + Debug + 'static;
}
