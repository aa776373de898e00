use anyhow::Result;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Relays data between two streams in both directions. Each direction runs
/// its own independent copy loop: one side hitting EOF closes that side's
/// destination but does not cut the other direction short.
pub struct Tunnel<'a, X, Y>
where
    X: AsyncRead + AsyncWrite + Unpin,
    Y: AsyncRead + AsyncWrite + Unpin,
{
    l2r: &'a mut X,
    r2l: &'a mut Y,
    buf_size: usize,
}

impl<'a, X, Y> Tunnel<'a, X, Y>
where
    X: AsyncRead + AsyncWrite + Unpin,
    Y: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(l2r: &'a mut X, r2l: &'a mut Y, buf_size: usize) -> Tunnel<'a, X, Y> {
        Tunnel { l2r, r2l, buf_size }
    }

    /// Runs both directions to completion, returning `(left_to_right,
    /// right_to_left)` byte counts. Splitting each stream's read/write halves
    /// would need `X`/`Y` to be splittable, which callers aren't guaranteed
    /// to provide (a `TcpStream` is, but a mocked test stream may not be);
    /// instead the two directions are driven by a single task, polling
    /// whichever side still has work left.
    pub async fn run(&mut self) -> Result<(u64, u64)> {
        let mut l2r_buf = vec![0u8; self.buf_size];
        let mut r2l_buf = vec![0u8; self.buf_size];
        let (mut l2r_done, mut r2l_done) = (false, false);
        let (mut l2r_total, mut r2l_total) = (0u64, 0u64);

        while !l2r_done || !r2l_done {
            tokio::select! {
                res = self.l2r.read(&mut l2r_buf), if !l2r_done => {
                    let n = res?;
                    if n == 0 {
                        self.r2l.shutdown().await?;
                        l2r_done = true;
                        continue;
                    }
                    self.r2l.write_all(&l2r_buf[..n]).await?;
                    l2r_total += n as u64;
                }
                res = self.r2l.read(&mut r2l_buf), if !r2l_done => {
                    let n = res?;
                    if n == 0 {
                        self.l2r.shutdown().await?;
                        r2l_done = true;
                        continue;
                    }
                    self.l2r.write_all(&r2l_buf[..n]).await?;
                    r2l_total += n as u64;
                }
            }
        }

        Ok((l2r_total, r2l_total))
    }
}
