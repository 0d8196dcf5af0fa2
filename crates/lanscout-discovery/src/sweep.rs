//! Concurrent subnet sweep and host classification

use crate::{banner, ping, portscan};
use lanscout_core::{Device, DeviceClass, DiscoverySource, ResultSet, UNKNOWN_NAME};
use lanscout_snmp::{query_printer, SnmpConfig};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// JetDirect raw-print port; open means printer regardless of the banner
pub const RAW_PRINT_PORT: u16 = 9100;

/// Sweep settings, one snapshot per discovery call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// Subnet base address (e.g. 192.168.1.0)
    pub subnet: Ipv4Addr,
    /// Subnet prefix length (e.g. 24 for /24)
    pub prefix_len: u8,
    /// Ports probed on every reachable host
    pub candidate_ports: Vec<u16>,
    /// Timeout applied to each individual network probe
    pub probe_timeout_ms: u64,
    /// Upper bound on concurrently probed hosts
    pub max_concurrency: usize,
    /// Management-protocol client settings
    pub snmp: SnmpConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            subnet: Ipv4Addr::new(192, 168, 1, 0),
            prefix_len: 24,
            candidate_ports: portscan::DEFAULT_CANDIDATE_PORTS.to_vec(),
            probe_timeout_ms: 1000,
            max_concurrency: 128,
            snmp: SnmpConfig::default(),
        }
    }
}

/// One bounded-concurrency sweep over the configured subnet
pub struct SubnetSweep {
    config: SweepConfig,
}

impl SubnetSweep {
    pub fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    /// Probe every host address once and collect the classifications.
    ///
    /// One task per address, gated by a semaphore; every spawned task is
    /// joined before this returns, so the result set is complete, never
    /// partial. Results are keyed by address - arrival order is
    /// immaterial.
    pub async fn run(&self) -> ResultSet {
        let hosts = host_addresses(self.config.subnet, self.config.prefix_len);
        info!(
            subnet = %self.config.subnet,
            prefix = self.config.prefix_len,
            hosts = hosts.len(),
            "starting subnet sweep"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let config = Arc::new(self.config.clone());
        let mut tasks = JoinSet::new();

        for ip in hosts {
            let semaphore = semaphore.clone();
            let config = config.clone();
            tasks.spawn(async move {
                // never closed while tasks are in flight
                let _permit = semaphore.acquire_owned().await.ok()?;
                probe_host(ip, &config).await
            });
        }

        let mut results = ResultSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(device)) => {
                    trace!(ip = %device.ip, class = ?device.class, "sweep hit");
                    results.insert_if_absent(device);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "sweep task failed"),
            }
        }

        info!(found = results.len(), "subnet sweep complete");
        results
    }
}

/// Reachability, port probe, classification and naming for one address.
/// Every failure collapses to `None`; nothing is surfaced per-address.
async fn probe_host(ip: Ipv4Addr, config: &SweepConfig) -> Option<Device> {
    let probe_timeout = Duration::from_millis(config.probe_timeout_ms);

    if !ping::is_reachable(ip, &config.candidate_ports, probe_timeout).await {
        return None;
    }

    let open_ports = portscan::probe_ports(ip, &config.candidate_ports, probe_timeout).await;

    // the raw-print port alone decides; only otherwise is the banner worth a connection
    let banner_match = if open_ports.contains(&RAW_PRINT_PORT) {
        false
    } else if open_ports.contains(&banner::BANNER_PORT) {
        banner::banner_matches(ip, banner::BANNER_PORT, probe_timeout).await
    } else {
        false
    };

    let class = classify(&open_ports, banner_match);
    debug!(ip = %ip, open_ports = ?open_ports, class = ?class, "host classified");

    let name = resolve_hostname(ip)
        .await
        .unwrap_or_else(|| UNKNOWN_NAME.to_string());

    if class == DeviceClass::Printer {
        // Side-channel enrichment only: attribute failures are absorbed in
        // the collector, and nothing here changes the classification or
        // the device record.
        let attrs = query_printer(ip, &config.snmp).await;
        for (attr, value) in attrs.attributes() {
            info!(ip = %ip, attr = attr, value = %value, "printer attribute");
        }
    }

    Some(Device::new(ip, name, class, DiscoverySource::Sweep))
}

/// Pure classification over the probe evidence
fn classify(open_ports: &[u16], banner_match: bool) -> DeviceClass {
    if open_ports.contains(&RAW_PRINT_PORT) || banner_match {
        DeviceClass::Printer
    } else {
        DeviceClass::Host
    }
}

/// Enumerate probeable host addresses of `subnet/prefix_len`, excluding the
/// network and broadcast addresses. /31 and /32 have no sweepable hosts.
pub fn host_addresses(subnet: Ipv4Addr, prefix_len: u8) -> Vec<Ipv4Addr> {
    if prefix_len >= 31 {
        return Vec::new();
    }
    let mask = !((1u32 << (32 - prefix_len)) - 1);
    let network = u32::from(subnet) & mask;
    let broadcast = network | !mask;
    ((network + 1)..broadcast).map(Ipv4Addr::from).collect()
}

/// Reverse-DNS name for a swept host. The resolver call is blocking, so it
/// runs on the blocking pool. A lookup that merely echoes the address back
/// counts as unresolved.
async fn resolve_hostname(ip: Ipv4Addr) -> Option<String> {
    let joined =
        tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&IpAddr::V4(ip)).ok()).await;
    match joined {
        Ok(Some(name)) if !name.is_empty() && name != ip.to_string() => Some(name),
        _ => None,
    }
}
