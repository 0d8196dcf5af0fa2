//! Application state

use crate::config::Config;
use lanscout_core::ResultSet;
use lanscout_discovery::{discover, DiscoveryError, MdnsConfig, SweepConfig};
use std::sync::Arc;
use tracing::info;

/// Shared application state: the effective configuration plus the derived
/// engine settings. Discovery itself is stateless - every request runs a
/// fresh cycle and nothing is retained in between.
pub struct AppState {
    pub config: Config,
    sweep: SweepConfig,
    mdns: MdnsConfig,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let sweep = config.to_sweep_config();
        let mdns = config.to_mdns_config();
        info!(
            subnet = %sweep.subnet,
            prefix = sweep.prefix_len,
            service_type = %mdns.service_type,
            "discovery engine configured"
        );
        Arc::new(Self {
            config,
            sweep,
            mdns,
        })
    }

    /// One full discovery cycle: sweep and browse concurrently, then merge
    pub async fn discover(&self) -> Result<ResultSet, DiscoveryError> {
        discover(&self.sweep, &self.mdns).await
    }
}
