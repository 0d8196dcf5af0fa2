//! Configuration loading and validation

use anyhow::Result;
use lanscout_discovery::{MdnsConfig, SweepConfig};
use lanscout_snmp::SnmpConfig;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub mdns: MdnsSection,
    #[serde(default)]
    pub snmp: SnmpSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for the web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Label applied to printer-classified devices with no resolved name
    #[serde(default = "default_printer_label")]
    pub printer_label: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            printer_label: default_printer_label(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_printer_label() -> String {
    "possible printer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Subnet to sweep; autodetected from the first usable interface when
    /// absent
    #[serde(default)]
    pub subnet: Option<Ipv4Addr>,
    /// Subnet prefix length
    #[serde(default = "default_prefix")]
    pub prefix_len: u8,
    /// Ports probed on every reachable host
    #[serde(default = "default_candidate_ports")]
    pub candidate_ports: Vec<u16>,
    /// Per-probe timeout in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
    /// Upper bound on concurrently probed hosts
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            subnet: None,
            prefix_len: default_prefix(),
            candidate_ports: default_candidate_ports(),
            probe_timeout_ms: default_probe_timeout(),
            max_concurrency: default_concurrency(),
        }
    }
}

fn default_prefix() -> u8 {
    24
}

fn default_candidate_ports() -> Vec<u16> {
    lanscout_discovery::portscan::DEFAULT_CANDIDATE_PORTS.to_vec()
}

fn default_probe_timeout() -> u64 {
    1000
}

fn default_concurrency() -> usize {
    128
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdnsSection {
    /// Service type to browse for
    #[serde(default = "default_service_type")]
    pub service_type: String,
    /// Browse window in milliseconds
    #[serde(default = "default_browse_window")]
    pub browse_window_ms: u64,
}

impl Default for MdnsSection {
    fn default() -> Self {
        Self {
            service_type: default_service_type(),
            browse_window_ms: default_browse_window(),
        }
    }
}

fn default_service_type() -> String {
    lanscout_discovery::mdns::DEFAULT_SERVICE_TYPE.to_string()
}

fn default_browse_window() -> u64 {
    lanscout_discovery::mdns::DEFAULT_BROWSE_WINDOW_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnmpSection {
    /// Read-only community string
    #[serde(default = "default_community")]
    pub community: String,
    /// Agent port
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_snmp_timeout")]
    pub timeout_ms: u64,
    /// Retry budget per attribute
    #[serde(default = "default_snmp_retries")]
    pub retries: u32,
}

impl Default for SnmpSection {
    fn default() -> Self {
        Self {
            community: default_community(),
            port: default_snmp_port(),
            timeout_ms: default_snmp_timeout(),
            retries: default_snmp_retries(),
        }
    }
}

fn default_community() -> String {
    lanscout_snmp::DEFAULT_COMMUNITY.to_string()
}

fn default_snmp_port() -> u16 {
    lanscout_snmp::SNMP_PORT
}

fn default_snmp_timeout() -> u64 {
    lanscout_snmp::DEFAULT_TIMEOUT_MS
}

fn default_snmp_retries() -> u32 {
    lanscout_snmp::DEFAULT_RETRIES
}

impl Config {
    /// Convert to SweepConfig, autodetecting the subnet when unset
    pub fn to_sweep_config(&self) -> SweepConfig {
        let (subnet, prefix_len) = match self.discovery.subnet {
            Some(subnet) => (subnet, self.discovery.prefix_len),
            None => detect_local_subnet().unwrap_or((Ipv4Addr::new(192, 168, 1, 0), 24)),
        };
        SweepConfig {
            subnet,
            prefix_len,
            candidate_ports: self.discovery.candidate_ports.clone(),
            probe_timeout_ms: self.discovery.probe_timeout_ms,
            max_concurrency: self.discovery.max_concurrency,
            snmp: SnmpConfig {
                port: self.snmp.port,
                community: self.snmp.community.clone(),
                timeout_ms: self.snmp.timeout_ms,
                retries: self.snmp.retries,
            },
        }
    }

    pub fn to_mdns_config(&self) -> MdnsConfig {
        MdnsConfig {
            service_type: self.mdns.service_type.clone(),
            browse_window_ms: self.mdns.browse_window_ms,
        }
    }
}

/// Subnet of the first non-loopback IPv4 interface, if any
pub fn detect_local_subnet() -> Option<(Ipv4Addr, u8)> {
    use network_interface::{NetworkInterface, NetworkInterfaceConfig};

    NetworkInterface::show()
        .unwrap_or_default()
        .into_iter()
        .filter(|iface| {
            !iface.name.starts_with("lo")
                && !iface.name.starts_with("docker")
                && !iface.name.starts_with("br-")
                && !iface.name.starts_with("veth")
        })
        .find_map(|iface| {
            iface.addr.iter().find_map(|addr| {
                if let network_interface::Addr::V4(v4) = addr {
                    if v4.ip.is_loopback() {
                        return None;
                    }
                    let prefix = v4
                        .netmask
                        .map(|m| u32::from(m).count_ones() as u8)
                        .unwrap_or(24);
                    let mask = if prefix == 0 { 0 } else { !0u32 << (32 - prefix) };
                    let subnet = Ipv4Addr::from(u32::from(v4.ip) & mask);
                    Some((subnet, prefix))
                } else {
                    None
                }
            })
        })
}

/// Load configuration from file, falling back to defaults when absent
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.bind, "0.0.0.0:8080");
        assert_eq!(config.daemon.printer_label, "possible printer");
        assert_eq!(config.discovery.subnet, None);
        assert_eq!(config.discovery.candidate_ports, vec![80, 443, 515, 631, 9100]);
        assert_eq!(config.snmp.community, "public");
        assert_eq!(config.snmp.retries, 3);
        assert_eq!(config.mdns.browse_window_ms, 5000);
    }

    #[test]
    fn test_explicit_subnet_is_respected() {
        let config: Config = toml::from_str(
            r#"
            [discovery]
            subnet = "10.1.2.0"
            prefix_len = 25
            max_concurrency = 32
            "#,
        )
        .unwrap();
        let sweep = config.to_sweep_config();
        assert_eq!(sweep.subnet, Ipv4Addr::new(10, 1, 2, 0));
        assert_eq!(sweep.prefix_len, 25);
        assert_eq!(sweep.max_concurrency, 32);
    }

    #[test]
    fn test_snmp_section_maps_through() {
        let config: Config = toml::from_str(
            r#"
            [snmp]
            community = "internal"
            timeout_ms = 500
            "#,
        )
        .unwrap();
        let sweep = config.to_sweep_config();
        assert_eq!(sweep.snmp.community, "internal");
        assert_eq!(sweep.snmp.timeout_ms, 500);
        assert_eq!(sweep.snmp.port, 161);
    }
}
