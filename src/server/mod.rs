pub mod connection;
pub mod relay;

use crate::{
    auth::Authenticator,
    config::Config,
    logging,
    metrics::Metrics,
    net::tcp::{TcpConnection, TcpListener},
};
use anyhow::Result;
use async_listen::is_transient_error;
use log::{error, info, warn};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{signal, time::sleep};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Owns the listening socket and the set of in-flight connection tasks.
pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
    authenticator: Arc<Authenticator>,
    metrics: Arc<Metrics>,
    task_tracker: TaskTracker,
    task_cancellation_token: CancellationToken,
}

impl Server {
    /// Delay after a non-transient TCP acception failure, e.g. resource exhaustion.
    const DELAY_AFTER_ERROR_MILLIS: u64 = 500;
    const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(60);

    pub async fn bind(config: Config) -> Result<Server> {
        let listener = TcpListener::bind((config.ipv4(), config.port())).await?;
        let authenticator = Authenticator::new(config.credentials());

        Ok(Server {
            listener,
            config: Arc::new(config),
            authenticator: Arc::new(authenticator),
            metrics: Arc::new(Metrics::new()),
            task_tracker: TaskTracker::new(),
            task_cancellation_token: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn run(&self) -> Result<()> {
        info!("proxy is listening on {}", self.local_addr());
        self.metrics.on_server_started();

        if self.config.metrics_enabled() {
            self.spawn_metrics_reporter();
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => self.on_tcp_connection_established(conn),
                    Err(err) => self.on_tcp_acception_error(err).await,
                },
                _ = signal::ctrl_c() => {
                    info!("received Ctrl+C, gracefully tearing down");
                    self.on_shutdown_requested();
                    break
                }
            }
        }

        self.task_tracker.wait().await;
        Ok(())
    }

    async fn on_tcp_acception_error(&self, err: anyhow::Error) {
        logging::log_tcp_acception_error!(err);
        self.metrics.on_connection_failed();

        if let Some(err) = err.downcast_ref::<std::io::Error>() {
            if !is_transient_error(err) {
                sleep(Duration::from_millis(Server::DELAY_AFTER_ERROR_MILLIS)).await;
            }
        }
    }

    fn on_tcp_connection_established(&self, conn: TcpConnection) {
        let peer_addr = conn.peer_addr();
        logging::log_tcp_established_conn!(peer_addr);
        self.metrics.on_connection_accepted();

        let authenticator = Arc::clone(&self.authenticator);
        let config = Arc::clone(&self.config);
        let metrics = Arc::clone(&self.metrics);
        let token = self.task_cancellation_token.clone();

        self.task_tracker.spawn(async move {
            tokio::select! {
                res = connection::handle(conn, authenticator, config, Arc::clone(&metrics)) => {
                    if let Err(err) = res {
                        logging::log_tcp_closed_conn_with_error!(peer_addr, err);
                    } else {
                        logging::log_tcp_closed_conn!(peer_addr);
                    }
                },
                _ = token.cancelled() => {
                    logging::log_tcp_canceled_conn!(peer_addr);
                }
            }
            metrics.on_connection_closed();
        });
    }

    fn on_shutdown_requested(&self) {
        self.task_tracker.close();
        self.task_cancellation_token.cancel();
    }

    fn spawn_metrics_reporter(&self) {
        let metrics = Arc::clone(&self.metrics);
        let token = self.task_cancellation_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sleep(Server::METRICS_LOG_INTERVAL) => info!("{}", metrics.snapshot()),
                    _ = token.cancelled() => break,
                }
            }
        });
    }
}
