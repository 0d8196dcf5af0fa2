//! Banner fingerprinting
//!
//! Weak identity heuristic: connect to the web management port and read
//! whatever the peer volunteers first. A banner that is non-empty and not
//! the "unknown" sentinel counts as a match. No protocol parsing - this
//! only distinguishes "got some banner" from "got nothing".

use lanscout_core::UNKNOWN_NAME;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

/// Port the banner probe connects to
pub const BANNER_PORT: u16 = 80;

/// Upper bound on how much of the banner is read
const BANNER_MAX: usize = 1024;

/// Connection and read errors both read as "no match".
pub async fn banner_matches(ip: Ipv4Addr, port: u16, probe_timeout: Duration) -> bool {
    let addr = SocketAddr::new(IpAddr::V4(ip), port);
    let mut stream = match timeout(probe_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(_)) | Err(_) => return false,
    };

    let mut buf = [0u8; BANNER_MAX];
    let n = match timeout(probe_timeout, stream.read(&mut buf)).await {
        Ok(Ok(n)) => n,
        Ok(Err(_)) | Err(_) => return false,
    };

    let banner = String::from_utf8_lossy(&buf[..n]);
    let banner = banner.trim();
    let matched = !banner.is_empty() && banner != UNKNOWN_NAME;
    trace!(ip = %ip, port = port, bytes = n, matched = matched, "banner probe");
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    async fn serve_banner(banner: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(banner).await;
            }
        });
        port
    }

    #[tokio::test]
    async fn test_banner_match() {
        let port = serve_banner(b"JetDirect ready\r\n").await;
        assert!(banner_matches(Ipv4Addr::LOCALHOST, port, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_silent_peer_is_negative() {
        let port = serve_banner(b"").await;
        assert!(!banner_matches(Ipv4Addr::LOCALHOST, port, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_sentinel_banner_is_negative() {
        let port = serve_banner(b"unknown").await;
        assert!(!banner_matches(Ipv4Addr::LOCALHOST, port, Duration::from_millis(500)).await);
    }

    #[tokio::test]
    async fn test_refused_connection_is_negative() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(!banner_matches(Ipv4Addr::LOCALHOST, port, Duration::from_millis(500)).await);
    }
}
