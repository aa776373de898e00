use super::{FramedRead, FramedWrite, WireRead, WireWrite};
use anyhow::Result;
use log::trace;
use std::{
    fmt::Debug,
    ops::{Deref, DerefMut},
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Thin wrapper around a raw stream that adds framed message read/write.
pub struct FramedStream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    stream: Stream,
}

impl<Stream> FramedStream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    pub fn new(stream: Stream) -> FramedStream<Stream> {
        FramedStream { stream }
    }

    pub fn into_inner(self) -> Stream {
        self.stream
    }
}

impl<Stream> FramedRead for FramedStream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    async fn read_message<M>(&mut self) -> Result<M>
    where
        M: WireRead + Debug,
    {
        let message = M::read_from(&mut self.stream).await?;
        trace!("read {:?}", message);

        Ok(message)
    }
}

impl<Stream> FramedWrite for FramedStream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    async fn write_message<M>(&mut self, message: M) -> Result<()>
    where
        M: WireWrite + Debug,
    {
        M::write_to(&message, &mut self.stream).await?;
        trace!("wrote {:?}", message);

        Ok(())
    }
}

impl<Stream> Deref for FramedStream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    type Target = Stream;
    fn deref(&self) -> &Self::Target {
        &self.stream
    }
}

impl<Stream> DerefMut for FramedStream<Stream>
where
    Stream: AsyncReadExt + AsyncWriteExt + Unpin,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.stream
    }
}
