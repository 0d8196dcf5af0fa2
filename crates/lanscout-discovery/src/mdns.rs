//! mDNS service-advertisement collection

use crate::DiscoveryError;
use lanscout_core::{Device, DeviceClass, DiscoverySource, UNKNOWN_NAME};
use mdns_sd::{ServiceDaemon, ServiceEvent};
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace};

/// Meta-service enumerating every advertised service type
pub const DEFAULT_SERVICE_TYPE: &str = "_services._dns-sd._udp.local.";

/// How long the browse window stays open
pub const DEFAULT_BROWSE_WINDOW_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdnsConfig {
    pub service_type: String,
    pub browse_window_ms: u64,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            browse_window_ms: DEFAULT_BROWSE_WINDOW_MS,
        }
    }
}

/// Browse for the configured service type until the window elapses.
///
/// Produces one `Device` per advertised IPv4 address; an instance that
/// advertises several addresses yields several records carrying the same
/// name, so advertisement results merge against sweep results under the
/// same address key. Advertisements that miss the deadline are simply
/// absent. Only daemon construction or browse registration can fail.
pub async fn browse(config: &MdnsConfig) -> Result<Vec<Device>, DiscoveryError> {
    let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError::MdnsInit(e.to_string()))?;
    let receiver = daemon
        .browse(&config.service_type)
        .map_err(|e| DiscoveryError::MdnsBrowse {
            service_type: config.service_type.clone(),
            reason: e.to_string(),
        })?;

    let class = class_for_service_type(&config.service_type);
    let deadline = Instant::now() + Duration::from_millis(config.browse_window_ms);
    let mut devices = Vec::new();

    loop {
        let event = match timeout_at(deadline, receiver.recv_async()).await {
            Ok(Ok(event)) => event,
            // channel closed or window elapsed - either way the browse is over
            Ok(Err(_)) | Err(_) => break,
        };

        match event {
            ServiceEvent::ServiceResolved(info) => {
                let label = instance_label(info.get_fullname());
                trace!(
                    instance = %label,
                    addresses = info.get_addresses().len(),
                    "service resolved"
                );
                devices.extend(advertisement_devices(
                    &label,
                    info.get_addresses().iter().copied(),
                    class,
                ));
            }
            ServiceEvent::ServiceFound(service_type, name) => {
                trace!(service_type = %service_type, instance = %name, "service found");
            }
            _ => {}
        }
    }

    let _ = daemon.stop_browse(&config.service_type);
    let _ = daemon.shutdown();

    debug!(
        service_type = %config.service_type,
        devices = devices.len(),
        "mDNS browse window closed"
    );
    Ok(devices)
}

/// Raw-printing and IPP service types advertise printers; anything else is
/// reported as a generic host and left to the classifier-by-sweep.
fn class_for_service_type(service_type: &str) -> DeviceClass {
    const PRINTER_SERVICES: &[&str] = &["_printer.", "_ipp.", "_ipps.", "_pdl-datastream."];
    if PRINTER_SERVICES.iter().any(|s| service_type.contains(s)) {
        DeviceClass::Printer
    } else {
        DeviceClass::Host
    }
}

/// "Lobby Printer._ipp._tcp.local." -> "Lobby Printer"
fn instance_label(fullname: &str) -> String {
    let label = fullname.split("._").next().unwrap_or(fullname);
    if label.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        label.to_string()
    }
}

/// Flatten one advertised instance into one Device per IPv4 address
fn advertisement_devices(
    label: &str,
    addresses: impl Iterator<Item = IpAddr>,
    class: DeviceClass,
) -> Vec<Device> {
    addresses
        .filter_map(|addr| match addr {
            IpAddr::V4(ip) => Some(Device::new(
                ip,
                label,
                class,
                DiscoverySource::Advertisement,
            )),
            IpAddr::V6(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_instance_label() {
        assert_eq!(
            instance_label("Lobby Printer._ipp._tcp.local."),
            "Lobby Printer"
        );
        assert_eq!(instance_label("plain-host._http._tcp.local."), "plain-host");
        assert_eq!(instance_label(""), UNKNOWN_NAME);
    }

    #[test]
    fn test_class_for_service_type() {
        assert_eq!(
            class_for_service_type("_pdl-datastream._tcp.local."),
            DeviceClass::Printer
        );
        assert_eq!(
            class_for_service_type("_ipp._tcp.local."),
            DeviceClass::Printer
        );
        assert_eq!(
            class_for_service_type("_services._dns-sd._udp.local."),
            DeviceClass::Host
        );
    }

    #[test]
    fn test_one_device_per_address() {
        let devices = advertisement_devices(
            "mfp-3rd-floor",
            [
                IpAddr::V4(Ipv4Addr::new(10, 0, 0, 8)),
                IpAddr::V4(Ipv4Addr::new(10, 0, 1, 8)),
                IpAddr::V6(std::net::Ipv6Addr::LOCALHOST),
            ]
            .into_iter(),
            DeviceClass::Printer,
        );
        assert_eq!(devices.len(), 2);
        assert!(devices.iter().all(|d| d.name == "mfp-3rd-floor"));
        assert!(devices
            .iter()
            .all(|d| d.source == DiscoverySource::Advertisement));
    }
}
