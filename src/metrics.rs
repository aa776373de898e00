use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Server-wide counters, shared across all connection tasks behind an `Arc`.
/// Logged periodically when `metrics_enabled` is set.
pub struct Metrics {
    is_started: AtomicBool,
    started_ts_millis: AtomicI64,

    connections_accepted: AtomicU64,
    connections_active: AtomicU64,
    connections_failed: AtomicU64,

    udp_associations_active: AtomicU64,
    bind_requests_active: AtomicU64,

    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl Metrics {
    pub fn new() -> Metrics {
        Metrics {
            is_started: AtomicBool::new(false),
            started_ts_millis: AtomicI64::new(0),
            connections_accepted: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            connections_failed: AtomicU64::new(0),
            udp_associations_active: AtomicU64::new(0),
            bind_requests_active: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    /// Called when the listening socket is bound and the accept loop starts.
    pub fn on_server_started(&self) {
        assert!(!self.is_started.load(Ordering::Relaxed), "server shouldn't be started yet");
        self.is_started.store(true, Ordering::Relaxed);
        self.started_ts_millis.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn is_server_started(&self) -> bool {
        self.is_started.load(Ordering::Relaxed)
    }

    /// Time elapsed since the server started accepting connections.
    pub fn uptime(&self) -> Duration {
        assert!(self.is_started.load(Ordering::Relaxed), "server should be already started");
        Utc::now() - self.started_at()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        assert!(self.is_started.load(Ordering::Relaxed), "server should be already started");
        DateTime::from_timestamp_millis(self.started_ts_millis.load(Ordering::Relaxed)).expect("valid datetime")
    }

    pub fn on_connection_accepted(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn on_connection_failed(&self) {
        self.connections_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_bind_started(&self) {
        self.bind_requests_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_bind_finished(&self) {
        self.bind_requests_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn on_udp_associate_started(&self) {
        self.udp_associations_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn on_udp_associate_finished(&self) {
        self.udp_associations_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn add_relayed_bytes(&self, sent: u64, received: u64) {
        self.bytes_sent.fetch_add(sent, Ordering::Relaxed);
        self.bytes_received.fetch_add(received, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_failed: self.connections_failed.load(Ordering::Relaxed),
            udp_associations_active: self.udp_associations_active.load(Ordering::Relaxed),
            bind_requests_active: self.bind_requests_active.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub connections_accepted: u64,
    pub connections_active: u64,
    pub connections_failed: u64,
    pub udp_associations_active: u64,
    pub bind_requests_active: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "connections: {} active / {} accepted / {} failed, bind: {} active, udp associate: {} active, traffic: {} sent / {} received",
            self.connections_active,
            self.connections_accepted,
            self.connections_failed,
            self.bind_requests_active,
            self.udp_associations_active,
            human_bytes::human_bytes(self.bytes_sent as f64),
            human_bytes::human_bytes(self.bytes_received as f64),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_active_connections() {
        let metrics = Metrics::new();
        metrics.on_connection_accepted();
        metrics.on_connection_accepted();
        metrics.on_connection_closed();

        let snapshot = metrics.snapshot();
        assert_eq!(2, snapshot.connections_accepted);
        assert_eq!(1, snapshot.connections_active);
    }

    #[test]
    fn accumulates_relayed_bytes() {
        let metrics = Metrics::new();
        metrics.add_relayed_bytes(100, 50);
        metrics.add_relayed_bytes(10, 5);

        let snapshot = metrics.snapshot();
        assert_eq!(110, snapshot.bytes_sent);
        assert_eq!(55, snapshot.bytes_received);
    }

    #[test]
    fn uptime_tracks_start() {
        let metrics = Metrics::new();
        assert!(!metrics.is_server_started());
        metrics.on_server_started();
        assert!(metrics.is_server_started());
        assert!(metrics.uptime() >= Duration::zero());
    }
}
