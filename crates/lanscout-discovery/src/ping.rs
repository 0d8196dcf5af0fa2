//! Reachability probing
//!
//! ICMP echo first; when the environment refuses ICMP sockets the probe
//! degrades to TCP connect attempts against the candidate ports. A refused
//! connection still proves the address is occupied.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

const ECHO_PAYLOAD: [u8; 8] = [0; 8];

/// Best-effort liveness check, bounded by `probe_timeout`.
///
/// False negatives are tolerated; every failure mode (timeout, unreachable,
/// missing privileges) reads as "dead".
pub async fn is_reachable(ip: Ipv4Addr, fallback_ports: &[u16], probe_timeout: Duration) -> bool {
    match timeout(probe_timeout, surge_ping::ping(IpAddr::V4(ip), &ECHO_PAYLOAD)).await {
        Ok(Ok((_packet, rtt))) => {
            trace!(ip = %ip, rtt_ms = rtt.as_millis() as u64, "icmp echo reply");
            true
        }
        Ok(Err(surge_ping::SurgeError::IOError(e))) => {
            // ICMP sockets usually need CAP_NET_RAW
            trace!(ip = %ip, error = %e, "icmp unavailable, trying tcp connect");
            tcp_reachable(ip, fallback_ports, probe_timeout).await
        }
        Ok(Err(_)) | Err(_) => false,
    }
}

/// TCP liveness: an accepted or refused connection both mean something is
/// answering at the address; only timeouts and unreachable errors mean dead.
async fn tcp_reachable(ip: Ipv4Addr, ports: &[u16], probe_timeout: Duration) -> bool {
    for &port in ports {
        let addr = SocketAddr::new(IpAddr::V4(ip), port);
        match timeout(probe_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => return true,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => return true,
            Ok(Err(_)) | Err(_) => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_reachable_with_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(
            tcp_reachable(
                Ipv4Addr::LOCALHOST,
                &[port],
                Duration::from_millis(500)
            )
            .await
        );
    }

    #[tokio::test]
    async fn test_tcp_reachable_refused_counts_as_alive() {
        // Grab a free port, then close it so the connect gets RST
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(
            tcp_reachable(
                Ipv4Addr::LOCALHOST,
                &[port],
                Duration::from_millis(500)
            )
            .await
        );
    }

    #[tokio::test]
    async fn test_is_reachable_loopback() {
        // Works whether or not ICMP sockets are permitted: the fallback
        // hits the listening port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(
            is_reachable(
                Ipv4Addr::LOCALHOST,
                &[port],
                Duration::from_millis(1000)
            )
            .await
        );
    }
}
