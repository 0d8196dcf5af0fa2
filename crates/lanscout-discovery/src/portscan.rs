//! TCP port probing for printer classification

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::trace;

/// Default candidate ports: HTTP(S), LPD, IPP, JetDirect raw printing
pub const DEFAULT_CANDIDATE_PORTS: &[u16] = &[80, 443, 515, 631, 9100];

/// Try each candidate port once and return the subset that accepted a
/// connection, sorted. Sockets are closed as soon as the verdict is known;
/// nothing is cached between calls.
pub async fn probe_ports(ip: Ipv4Addr, ports: &[u16], probe_timeout: Duration) -> Vec<u16> {
    let mut tasks = JoinSet::new();

    for &port in ports {
        tasks.spawn(async move {
            let addr = SocketAddr::new(IpAddr::V4(ip), port);
            match timeout(probe_timeout, TcpStream::connect(addr)).await {
                // dropping the stream here closes the socket
                Ok(Ok(_stream)) => Some(port),
                Ok(Err(_)) | Err(_) => None,
            }
        });
    }

    let mut open = Vec::new();
    while let Some(result) = tasks.join_next().await {
        if let Ok(Some(port)) = result {
            trace!(ip = %ip, port = port, "port open");
            open.push(port);
        }
    }

    open.sort_unstable();
    open
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_ports_reports_exact_open_subset() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = listener.local_addr().unwrap().port();

        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed_port = closed.local_addr().unwrap().port();
        drop(closed);

        let open = probe_ports(
            Ipv4Addr::LOCALHOST,
            &[closed_port, open_port],
            Duration::from_millis(500),
        )
        .await;
        assert_eq!(open, vec![open_port]);
    }

    #[tokio::test]
    async fn test_probe_ports_empty_candidate_set() {
        let open = probe_ports(Ipv4Addr::LOCALHOST, &[], Duration::from_millis(100)).await;
        assert!(open.is_empty());
    }
}
