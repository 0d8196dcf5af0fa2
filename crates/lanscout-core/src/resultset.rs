//! Address-keyed collection of discovered devices

use crate::Device;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// The devices produced by one discovery call, keyed by address.
///
/// Keys are unique. Precedence between sources is an insertion discipline,
/// not an arrival-order accident: `insert_if_absent` never overwrites, so
/// whichever source is written first wins for a shared address.
///
/// Created fresh per discovery call and discarded with the response; nothing
/// is retained across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    devices: BTreeMap<Ipv4Addr, Device>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, replacing any existing entry for the same address.
    pub fn insert(&mut self, device: Device) -> Option<Device> {
        self.devices.insert(device.ip, device)
    }

    /// Insert only if the address is not yet present. Returns whether the
    /// device was actually stored.
    pub fn insert_if_absent(&mut self, device: Device) -> bool {
        use std::collections::btree_map::Entry;
        match self.devices.entry(device.ip) {
            Entry::Vacant(slot) => {
                slot.insert(device);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Fold another set in, keeping existing entries on key collisions.
    pub fn merge_from(&mut self, other: ResultSet) {
        for device in other.into_devices() {
            self.insert_if_absent(device);
        }
    }

    pub fn get(&self, ip: Ipv4Addr) -> Option<&Device> {
        self.devices.get(&ip)
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.devices.contains_key(&ip)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Consume the set, yielding devices in address order.
    pub fn into_devices(self) -> Vec<Device> {
        self.devices.into_values().collect()
    }
}

impl FromIterator<Device> for ResultSet {
    /// Collects with first-writer-wins semantics, matching `insert_if_absent`.
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        let mut set = Self::new();
        for device in iter {
            set.insert_if_absent(device);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceClass, DiscoverySource};

    fn host(ip: [u8; 4], name: &str) -> Device {
        Device::new(
            Ipv4Addr::from(ip),
            name,
            DeviceClass::Host,
            DiscoverySource::Sweep,
        )
    }

    #[test]
    fn test_first_writer_wins() {
        let mut set = ResultSet::new();
        assert!(set.insert_if_absent(host([10, 0, 0, 1], "first")));
        assert!(!set.insert_if_absent(host([10, 0, 0, 1], "second")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(Ipv4Addr::new(10, 0, 0, 1)).unwrap().name, "first");
    }

    #[test]
    fn test_merge_from_keeps_existing() {
        let mut set: ResultSet = [host([10, 0, 0, 1], "kept")].into_iter().collect();
        let other: ResultSet = [host([10, 0, 0, 1], "dropped"), host([10, 0, 0, 2], "new")]
            .into_iter()
            .collect();
        set.merge_from(other);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(Ipv4Addr::new(10, 0, 0, 1)).unwrap().name, "kept");
        assert_eq!(set.get(Ipv4Addr::new(10, 0, 0, 2)).unwrap().name, "new");
    }

    #[test]
    fn test_into_devices_address_order() {
        let set: ResultSet = [
            host([10, 0, 0, 9], "c"),
            host([10, 0, 0, 1], "a"),
            host([10, 0, 0, 5], "b"),
        ]
        .into_iter()
        .collect();
        let ips: Vec<Ipv4Addr> = set.into_devices().into_iter().map(|d| d.ip).collect();
        assert_eq!(
            ips,
            vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 5),
                Ipv4Addr::new(10, 0, 0, 9),
            ]
        );
    }
}
