//! Lanscout Core - device model shared by the discovery engine and daemon
//!
//! This crate provides the foundational types for the Lanscout system:
//! - Device records for discovered hosts and printers
//! - The address-keyed result set produced by one discovery call

pub mod device;
pub mod resultset;

pub use device::{Device, DeviceClass, DiscoverySource, UNKNOWN_NAME};
pub use resultset::ResultSet;
