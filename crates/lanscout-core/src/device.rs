//! Device types for discovered hosts and printers

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Name sentinel used when no label could be resolved for a device
pub const UNKNOWN_NAME: &str = "unknown";

/// Classification outcome for a probed host
///
/// The engine only records the outcome; whether unclassified hosts are
/// reported or dropped, and what label a printer gets, is caller policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Responds to the reachability probe but shows no printer signal
    Host,
    /// Raw-print port open, or a recognizable banner on the web port
    Printer,
}

/// Which discovery path produced a device record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverySource {
    /// mDNS service advertisement
    Advertisement,
    /// Active subnet sweep
    Sweep,
}

/// A discovered device
///
/// `ip` is the unique key within a result set. The wire contract for the
/// HTTP API is the `ip`/`name` pair; `class` and `source` are additive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub ip: Ipv4Addr,
    pub name: String,
    pub class: DeviceClass,
    pub source: DiscoverySource,
}

impl Device {
    pub fn new(
        ip: Ipv4Addr,
        name: impl Into<String>,
        class: DeviceClass,
        source: DiscoverySource,
    ) -> Self {
        Self {
            ip,
            name: name.into(),
            class,
            source,
        }
    }

    /// A device whose name could not be resolved
    pub fn unnamed(ip: Ipv4Addr, class: DeviceClass, source: DiscoverySource) -> Self {
        Self::new(ip, UNKNOWN_NAME, class, source)
    }

    pub fn is_named(&self) -> bool {
        self.name != UNKNOWN_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_device() {
        let device = Device::unnamed(
            Ipv4Addr::new(10, 0, 0, 7),
            DeviceClass::Host,
            DiscoverySource::Sweep,
        );
        assert_eq!(device.name, UNKNOWN_NAME);
        assert!(!device.is_named());
    }

    #[test]
    fn test_wire_shape() {
        let device = Device::new(
            Ipv4Addr::new(192, 168, 1, 42),
            "laser-2f",
            DeviceClass::Printer,
            DiscoverySource::Sweep,
        );
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["ip"], "192.168.1.42");
        assert_eq!(json["name"], "laser-2f");
        assert_eq!(json["class"], "printer");
        assert_eq!(json["source"], "sweep");
    }
}
