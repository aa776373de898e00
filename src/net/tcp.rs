use crate::net::resolve_sockaddr;
use anyhow::Result;
use socket2::{Domain, SockRef, Socket, TcpKeepalive, Type};
use std::{net::SocketAddr, time::Duration};
use tokio::net::{TcpListener as TokioTcpListener, TcpStream, ToSocketAddrs};

const TCP_LISTEN_BACKLOG: i32 = 1024;

/// TCP keepalive settings applied to a freshly established stream.
pub struct TcpConnectionOptions {
    keep_alive: Option<TcpKeepalive>,
}

impl TcpConnectionOptions {
    pub fn new() -> TcpConnectionOptions {
        TcpConnectionOptions { keep_alive: None }
    }

    pub fn set_keepalive(&mut self, keep_alive: TcpKeepalive) -> &mut TcpConnectionOptions {
        debug_assert!(self.keep_alive.is_none(), "should be unset");
        self.keep_alive = Some(keep_alive);
        self
    }

    pub fn apply_to(&self, tcp_stream: &TcpStream) -> Result<()> {
        let sock_ref = SockRef::from(tcp_stream);

        if let Some(keep_alive) = &self.keep_alive {
            sock_ref.set_tcp_keepalive(keep_alive)?;
        }

        Ok(())
    }
}

impl Default for TcpConnectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn default_keepalive() -> TcpKeepalive {
    TcpKeepalive::new()
        .with_time(Duration::from_secs(150)) // 2.5 min
        .with_interval(Duration::from_secs(30)) // 30 sec
        .with_retries(5)
}

/// Establishes a TCP connection to `addr`, applying `tcp_opts` right after
/// the stream is created.
pub async fn establish_tcp_connection_with_opts(addr: impl ToSocketAddrs, tcp_opts: &TcpConnectionOptions) -> Result<TcpStream> {
    let tcp_stream = TcpStream::connect(addr).await?;
    tcp_opts.apply_to(&tcp_stream)?;
    Ok(tcp_stream)
}

/// Establishes a TCP connection to `addr` with the default keepalive settings.
pub async fn establish_tcp_connection(addr: impl ToSocketAddrs) -> Result<TcpStream> {
    let mut tcp_opts = TcpConnectionOptions::new();
    tcp_opts.set_keepalive(default_keepalive());
    establish_tcp_connection_with_opts(addr, &tcp_opts).await
}

/// A TCP connection accepted on the proxy's listening socket, with its peer
/// and local addresses resolved up front so handlers don't need to touch
/// the raw stream just to log them.
pub struct TcpConnection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
}

impl TcpConnection {
    fn new(stream: TcpStream) -> Result<TcpConnection> {
        Ok(TcpConnection {
            peer_addr: stream.peer_addr()?,
            local_addr: stream.local_addr()?,
            stream,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_stream(self) -> TcpStream {
        self.stream
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }
}

/// Listens for inbound proxy connections.
pub struct TcpListener {
    inner: TokioTcpListener,
}

impl TcpListener {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<TcpListener> {
        let bind_addr = resolve_sockaddr(addr).await?;

        let socket = Socket::new(Domain::for_address(bind_addr), Type::STREAM, None)?;
        socket.bind(&bind_addr.into())?;
        socket.listen(TCP_LISTEN_BACKLOG)?;
        socket.set_nonblocking(true)?;

        let inner = TokioTcpListener::from_std(socket.into())?;

        Ok(TcpListener { inner })
    }

    pub async fn accept(&self) -> Result<TcpConnection> {
        let (stream, _) = self.inner.accept().await?;
        TcpConnection::new(stream)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr().expect("listener doesn't have a local address")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    const TEST_BIND_IPV4: &str = "127.0.0.1:0";

    #[tokio::test]
    async fn accepts_connections() {
        let listener = TcpListener::bind(TEST_BIND_IPV4).await.expect("listener should bind");
        let addr = listener.local_addr();

        tokio::spawn(async move {
            TcpStream::connect(addr).await.expect("client should connect");
        });

        let conn = timeout(Duration::from_secs(2), listener.accept())
            .await
            .expect("accept should complete")
            .expect("connection should be accepted");

        assert_eq!(addr, conn.local_addr());
    }
}
