//! REST API handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use lanscout_core::{Device, DeviceClass};
use lanscout_discovery::DiscoveryError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Run one full discovery cycle and return every live device
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("device discovery requested");
    match state.discover().await {
        Ok(results) => Json(results.into_devices()).into_response(),
        Err(e) => discovery_error(e),
    }
}

/// Same discovery, narrowed to printer-classified devices. Printers with no
/// resolved name get the configured label.
pub async fn list_printers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("printer discovery requested");
    match state.discover().await {
        Ok(results) => {
            let printers = label_printers(
                results.into_devices(),
                &state.config.daemon.printer_label,
            );
            Json(printers).into_response()
        }
        Err(e) => discovery_error(e),
    }
}

/// Filter to printers and label the unnamed ones
fn label_printers(devices: Vec<Device>, label: &str) -> Vec<Device> {
    devices
        .into_iter()
        .filter(|d| d.class == DeviceClass::Printer)
        .map(|mut d| {
            if !d.is_named() {
                d.name = label.to_string();
            }
            d
        })
        .collect()
}

fn discovery_error(e: DiscoveryError) -> axum::response::Response {
    warn!(error = %e, "discovery failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(e.to_string())),
    )
        .into_response()
}

/// Get the effective configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

/// Network interface info for choosing a sweep subnet
#[derive(Serialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub ip: String,
    pub subnet: String,
    pub prefix_len: u8,
}

/// List usable IPv4 network interfaces
pub async fn list_interfaces() -> impl IntoResponse {
    use network_interface::{NetworkInterface, NetworkInterfaceConfig};

    let interfaces: Vec<InterfaceInfo> = NetworkInterface::show()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|iface| {
            iface.addr.iter().find_map(|addr| {
                if let network_interface::Addr::V4(v4) = addr {
                    let prefix = v4
                        .netmask
                        .map(|m| u32::from(m).count_ones() as u8)
                        .unwrap_or(24);
                    let mask = if prefix == 0 { 0 } else { !0u32 << (32 - prefix) };
                    let subnet = std::net::Ipv4Addr::from(u32::from(v4.ip) & mask);
                    Some(InterfaceInfo {
                        name: iface.name.clone(),
                        ip: v4.ip.to_string(),
                        subnet: subnet.to_string(),
                        prefix_len: prefix,
                    })
                } else {
                    None
                }
            })
        })
        .filter(|iface| {
            !iface.name.starts_with("lo")
                && !iface.name.starts_with("docker")
                && !iface.name.starts_with("br-")
                && !iface.name.starts_with("veth")
                && iface.ip != "127.0.0.1"
        })
        .collect();

    Json(interfaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanscout_core::DiscoverySource;
    use std::net::Ipv4Addr;

    #[test]
    fn test_label_printers_filters_and_labels() {
        let devices = vec![
            Device::new(
                Ipv4Addr::new(10, 0, 0, 2),
                "workstation",
                DeviceClass::Host,
                DiscoverySource::Sweep,
            ),
            Device::unnamed(
                Ipv4Addr::new(10, 0, 0, 3),
                DeviceClass::Printer,
                DiscoverySource::Sweep,
            ),
            Device::new(
                Ipv4Addr::new(10, 0, 0, 4),
                "mfp-lobby",
                DeviceClass::Printer,
                DiscoverySource::Advertisement,
            ),
        ];

        let printers = label_printers(devices, "possible printer");
        assert_eq!(printers.len(), 2);
        assert_eq!(printers[0].name, "possible printer");
        assert_eq!(printers[1].name, "mfp-lobby");
    }
}
