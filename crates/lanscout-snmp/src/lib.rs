//! Lanscout SNMP - printer attribute queries over SNMP v2c
//!
//! A deliberately small client: community-string GET of single varbinds,
//! enough to read the handful of printer MIB attributes the discovery
//! engine reports. Not a general SNMP implementation.

pub mod query;
pub mod transport;

pub use query::{
    query_printer, PrinterQueryResult, QueryError, SnmpConfig, DEFAULT_COMMUNITY,
    DEFAULT_RETRIES, DEFAULT_TIMEOUT_MS, SNMP_PORT,
};
pub use transport::{SnmpTransport, SnmpValue};
