// Structured log events, one macro per event kind, in the style the rest
// of the crate uses instead of ad hoc info!()/error!() calls scattered
// through the handlers.

// TCP connection lifecycle

macro_rules! log_tcp_established_conn {
    ($conn_addr:expr) => {
        info!(
            "\n\n\tTCP connection has been OPENED: \
            \n\t\tpeer: '{}' \
            \n",
            $conn_addr,
        )
    };
}

macro_rules! log_tcp_closed_conn {
    ($conn_addr:expr) => {
        info!(
            "\n\n\tTCP connection has been CLOSED: \
            \n\t\tpeer: '{}' \
            \n",
            $conn_addr,
        )
    };
}

macro_rules! log_tcp_closed_conn_with_error {
    ($conn_addr:expr, $err:expr) => {
        error!(
            "\n\n\tTCP connection has been CLOSED with ERROR: \
            \n\t\tpeer: '{}' \
            \n\t\treason: '{}' \
            \n",
            $conn_addr, $err
        )
    };
}

macro_rules! log_tcp_canceled_conn {
    ($conn_addr:expr) => {
        info!(
            "\n\n\tTCP connection has been CANCELED during shutdown: \
            \n\t\tpeer: '{}' \
            \n",
            $conn_addr,
        )
    };
}

macro_rules! log_tcp_acception_error {
    ($err:expr) => {
        warn!(
            "\n\n\tTCP connection was NOT ACCEPTED: \
            \n\t\treason: '{}' \
            \n",
            $err
        )
    };
}

pub(crate) use log_tcp_acception_error;
pub(crate) use log_tcp_canceled_conn;
pub(crate) use log_tcp_closed_conn;
pub(crate) use log_tcp_closed_conn_with_error;
pub(crate) use log_tcp_established_conn;

// Request handling

macro_rules! log_request_handling_error {
    ($peer:expr, $err:expr, $req:expr, $resp:expr) => {
        error!(
            "\n\n\tError occured during REQUEST handling: \
            \n\t\tpeer: '{}' \
            \n\t\treason: '{}' \
            \n\t\trequest : '{:?}' \
            \n\t\tresponse: '{:?}' \
            \n",
            $peer, $err, $req, $resp
        )
    };
}

macro_rules! log_auth_failed {
    ($peer:expr, $method:expr) => {
        warn!(
            "\n\n\tAuthentication FAILED for peer '{}' using method '{:?}'\n",
            $peer, $method
        )
    };
}

pub(crate) use log_auth_failed;
pub(crate) use log_request_handling_error;

// TCP relay tunnel (CONNECT / BIND)

macro_rules! log_tunnel_created {
    ($peer:expr, $proxy:expr, $endpoint:expr) => {
        info!(
            "\n\n\tTunnel has been CREATED: \
            \n\t\tsource [{}] <--L--> proxy [{}] <--R--> destination [{}]\n",
            $peer, $proxy, $endpoint
        );
    };
}

macro_rules! log_tunnel_closed {
    ($peer:expr, $proxy:expr, $endpoint:expr, $l2r:expr, $r2l:expr) => {
        info!(
            "\n\n\tTunnel has been CLOSED: \
            \n\t\tsource [{}] <--L--> proxy [{}] <--R--> destination [{}] \
            \n\t\ttransmitted: L->R {}, R->L {}\n",
            $peer,
            $proxy,
            $endpoint,
            human_bytes($l2r as f64),
            human_bytes($r2l as f64)
        );
    };
}

macro_rules! log_tunnel_closed_with_error {
    ($peer:expr, $proxy:expr, $endpoint:expr, $err:expr) => {
        error!(
            "\n\n\tTunnel has been CLOSED with ERROR: \
            \n\t\tsource [{}] <--L--> proxy [{}] <--R--> destination [{}] \
            \n\t\terror: '{}'\n",
            $peer, $proxy, $endpoint, $err
        );
    };
}

pub(crate) use log_tunnel_closed;
pub(crate) use log_tunnel_closed_with_error;
pub(crate) use log_tunnel_created;

// UDP associate relay

macro_rules! log_udp_associate_created {
    ($peer:expr, $relay_addr:expr) => {
        info!(
            "\n\n\tUDP ASSOCIATE created for peer '{}', relay bound to '{}'\n",
            $peer, $relay_addr
        );
    };
}

macro_rules! log_udp_associate_closed {
    ($peer:expr, $relay_addr:expr, $datagrams:expr, $bytes:expr) => {
        info!(
            "\n\n\tUDP ASSOCIATE closed for peer '{}', relay '{}': \
            \n\t\trelayed {} datagram(s), {}\n",
            $peer,
            $relay_addr,
            $datagrams,
            human_bytes($bytes as f64)
        );
    };
}

macro_rules! log_udp_datagram_dropped {
    ($relay_addr:expr, $from:expr, $reason:expr) => {
        warn!(
            "\n\n\tUDP datagram received on '{}' from '{}' was DROPPED: \
            \n\t\treason: '{}'\n",
            $relay_addr, $from, $reason
        );
    };
}

pub(crate) use log_udp_associate_closed;
pub(crate) use log_udp_associate_created;
pub(crate) use log_udp_datagram_dropped;

// BIND command

macro_rules! log_bind_listening {
    ($peer:expr, $bound_addr:expr) => {
        info!("\n\n\tBIND listener OPENED for peer '{}' on '{}'\n", $peer, $bound_addr);
    };
}

macro_rules! log_bind_peer_mismatch {
    ($expected:expr, $actual:expr) => {
        warn!(
            "\n\n\tBIND incoming connection REJECTED, peer address mismatch: \
            \n\t\texpected: '{}' \
            \n\t\tactual:   '{}'\n",
            $expected, $actual
        );
    };
}

pub(crate) use log_bind_listening;
pub(crate) use log_bind_peer_mismatch;
