use crate::auth::Credentials;
use clap::Parser;
use std::net::IpAddr;

pub const LOG4RS_CONFIG_FILE_PATH: &str = "log4rs.yaml";

#[derive(Parser, Debug)]
#[clap(author, about = "Async SOCKS5 proxy (RFC 1928 / RFC 1929)", version)]
pub struct Config {
    /// IP address to listen on (IPv4 or IPv6).
    #[clap(short, long, default_value = "0.0.0.0")]
    ipv4: IpAddr,

    /// TCP port to listen on.
    #[clap(short, long, default_value_t = 1080)]
    port: u16,

    /// Number of worker threads for the tokio runtime. Defaults to the number of CPUs.
    #[clap(long)]
    worker_threads: Option<usize>,

    /// Require username/password authentication (RFC 1929) instead of allowing anonymous clients.
    #[clap(long, requires_all = ["username", "password"])]
    auth_enabled: bool,

    /// Username expected when `auth_enabled` is set.
    #[clap(long)]
    username: Option<String>,

    /// Password expected when `auth_enabled` is set.
    #[clap(long)]
    password: Option<String>,

    /// Idle timeout applied to each stage of framed I/O (handshake, request, relay idle), in milliseconds.
    #[clap(long, default_value_t = 60_000)]
    idle_timeout_ms: u64,

    /// How long a BIND listener waits for the expected peer to connect, in milliseconds.
    #[clap(long, default_value_t = 30_000)]
    bind_wait_timeout_ms: u64,

    /// Size of the buffer used to copy bytes through a TCP relay tunnel.
    #[clap(long, default_value_t = 16384)]
    tcp_buf_size: usize,

    /// Size of the buffer used to receive a single UDP relay datagram.
    #[clap(long, default_value_t = 65535)]
    udp_buf_size: usize,

    /// Enable periodic logging of server-wide metrics.
    #[clap(long)]
    metrics_enabled: bool,
}

impl Config {
    pub fn ipv4(&self) -> IpAddr {
        self.ipv4
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> Option<usize> {
        self.worker_threads
    }

    pub fn credentials(&self) -> Option<Credentials> {
        if self.auth_enabled {
            Some(Credentials::new(
                self.username.clone().expect("clap enforces username with auth_enabled"),
                self.password.clone().expect("clap enforces password with auth_enabled"),
            ))
        } else {
            None
        }
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn bind_wait_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.bind_wait_timeout_ms)
    }

    pub fn tcp_buf_size(&self) -> usize {
        self.tcp_buf_size
    }

    pub fn udp_buf_size(&self) -> usize {
        self.udp_buf_size
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }
}
