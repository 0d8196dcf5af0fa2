//! Lanscout Discovery - local-network device discovery engine
//!
//! Two independent sources feed one result set:
//! - an active sweep of an IPv4 subnet: reachability probe, TCP port probe,
//!   banner fingerprint, SNMP enrichment for printer-classified hosts
//! - an mDNS service-advertisement browse over a bounded window
//!
//! The merge keys both sources by address, advertisement entries taking
//! precedence over sweep entries for shared addresses.

pub mod banner;
pub mod mdns;
pub mod merge;
pub mod ping;
pub mod portscan;
pub mod sweep;

pub use mdns::MdnsConfig;
pub use sweep::{SubnetSweep, SweepConfig};

use lanscout_core::ResultSet;
use thiserror::Error;

/// Errors that abort a whole discovery call.
///
/// Only the mDNS daemon itself can fail a call; per-address and
/// per-attribute failures are absorbed by the probers and read as
/// "not found".
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("mDNS daemon init failed: {0}")]
    MdnsInit(String),
    #[error("mDNS browse failed for {service_type}: {reason}")]
    MdnsBrowse {
        service_type: String,
        reason: String,
    },
}

/// Run one full discovery cycle: browse and sweep concurrently, then merge.
pub async fn discover(
    sweep: &SweepConfig,
    mdns: &MdnsConfig,
) -> Result<ResultSet, DiscoveryError> {
    let sweeper = SubnetSweep::new(sweep.clone());
    let (advertised, swept) = tokio::join!(
        mdns::browse(mdns),
        sweeper.run()
    );
    Ok(merge::merge(advertised?, swept))
}
