//! Printer attribute queries
//!
//! Each attribute is one GET against a fixed OID. Failures are independent:
//! one attribute timing out leaves the others intact, and `query_printer`
//! never fails its caller - the result just carries fewer fields.

use anyhow::Result;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::{debug, info};

use crate::transport::{SnmpTransport, SnmpValue};

/// Well-known SNMP agent port
pub const SNMP_PORT: u16 = 161;

/// Read-only community string most printers ship with
pub const DEFAULT_COMMUNITY: &str = "public";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default retry budget per attribute
pub const DEFAULT_RETRIES: u32 = 3;

/// Attribute OIDs from the standard system and printer MIBs
mod oid {
    /// sysName.0
    pub const DEVICE_NAME: &str = "1.3.6.1.2.1.1.5.0";
    /// hrDeviceDescr.1
    pub const MODEL: &str = "1.3.6.1.2.1.25.3.2.1.3.1";
    /// prtMarkerLifeCount.1.1
    pub const PAGE_COUNT: &str = "1.3.6.1.2.1.43.10.2.1.4.1.1";
    /// prtMarkerSuppliesLevel.1.1
    pub const SUPPLY_LEVEL: &str = "1.3.6.1.2.1.43.11.1.1.9.1.1";
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("unexpected value type for {oid}: {value}")]
    UnexpectedType { oid: &'static str, value: String },
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Client settings for the management-protocol collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpConfig {
    pub port: u16,
    pub community: String,
    pub timeout_ms: u64,
    pub retries: u32,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            port: SNMP_PORT,
            community: DEFAULT_COMMUNITY.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
        }
    }
}

/// Attribute values retrieved from a printer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrinterQueryResult {
    /// sysName
    pub name: Option<String>,
    /// Device description, usually vendor and model
    pub model: Option<String>,
    /// Lifetime page counter
    pub page_count: Option<u64>,
    /// Marker supply (toner/ink) level; -2 and -3 are MIB sentinels for
    /// "unknown" and "some remaining"
    pub supply_level: Option<i64>,
}

impl PrinterQueryResult {
    /// The attributes that were actually retrieved, as name/value pairs
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::new();
        if let Some(name) = &self.name {
            attrs.push(("name", name.clone()));
        }
        if let Some(model) = &self.model {
            attrs.push(("model", model.clone()));
        }
        if let Some(pages) = self.page_count {
            attrs.push(("page_count", pages.to_string()));
        }
        if let Some(level) = self.supply_level {
            attrs.push(("supply_level", level.to_string()));
        }
        attrs
    }

    pub fn is_empty(&self) -> bool {
        self.attributes().is_empty()
    }
}

/// Query a suspected printer for its descriptive attributes.
///
/// Best-effort on every level: transport setup failure or any per-attribute
/// failure degrades to absent fields, logged at debug. Callers can treat the
/// result as purely informational.
pub async fn query_printer(ip: Ipv4Addr, config: &SnmpConfig) -> PrinterQueryResult {
    let mut result = PrinterQueryResult::default();

    let mut transport = match SnmpTransport::new(
        &ip.to_string(),
        config.port,
        &config.community,
        config.timeout_ms,
        config.retries,
    )
    .await
    {
        Ok(t) => t,
        Err(e) => {
            debug!(ip = %ip, error = %e, "SNMP transport setup failed");
            return result;
        }
    };

    match get_string(&mut transport, oid::DEVICE_NAME).await {
        Ok(name) if !name.is_empty() => result.name = Some(name),
        Ok(_) => {}
        Err(e) => debug!(ip = %ip, error = %e, "device name query failed"),
    }

    match get_string(&mut transport, oid::MODEL).await {
        Ok(model) if !model.is_empty() => result.model = Some(model),
        Ok(_) => {}
        Err(e) => debug!(ip = %ip, error = %e, "model query failed"),
    }

    match get_unsigned(&mut transport, oid::PAGE_COUNT).await {
        Ok(pages) => result.page_count = Some(pages),
        Err(e) => debug!(ip = %ip, error = %e, "page count query failed"),
    }

    match get_signed(&mut transport, oid::SUPPLY_LEVEL).await {
        Ok(level) => result.supply_level = Some(level),
        Err(e) => debug!(ip = %ip, error = %e, "supply level query failed"),
    }

    if !result.is_empty() {
        info!(ip = %ip, attrs = result.attributes().len(), "printer attributes retrieved");
    }

    result
}

async fn get_string(
    transport: &mut SnmpTransport,
    oid: &'static str,
) -> Result<String, QueryError> {
    match transport.get(oid).await? {
        SnmpValue::OctetString(s) => Ok(s),
        other => Err(QueryError::UnexpectedType {
            oid,
            value: other.to_string(),
        }),
    }
}

async fn get_unsigned(
    transport: &mut SnmpTransport,
    oid: &'static str,
) -> Result<u64, QueryError> {
    let value = transport.get(oid).await?;
    value.as_u64().ok_or(QueryError::UnexpectedType {
        oid,
        value: value.to_string(),
    })
}

async fn get_signed(transport: &mut SnmpTransport, oid: &'static str) -> Result<i64, QueryError> {
    let value = transport.get(oid).await?;
    value.as_i64().ok_or(QueryError::UnexpectedType {
        oid,
        value: value.to_string(),
    })
}
