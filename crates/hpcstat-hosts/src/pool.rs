//! Host pool classes: core counts and telemetry addressing.
//!
//! Every host belongs to the pool named by its alphabetic prefix. The pool
//! table is built in, but a site can replace it with a JSON cluster file:
//!
//! ```json
//! [
//!   { "prefix": "dn", "class": "compute", "cores": 28,
//!     "address": { "kind": "offset", "network": "10.10.9", "base": 100 } },
//!   { "prefix": "cn", "class": "storage", "cores": 16,
//!     "address": { "kind": "none" } }
//! ]
//! ```

use crate::Host;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolClass {
    Storage,
    Compute,
    Gpu,
    HighMemory,
}

impl fmt::Display for PoolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolClass::Storage => "storage",
            PoolClass::Compute => "compute",
            PoolClass::Gpu => "gpu",
            PoolClass::HighMemory => "high-memory",
        };
        f.write_str(name)
    }
}

/// How a host index maps onto the last octet of its telemetry address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddressRule {
    /// `network.(base + index)`
    Offset { network: String, base: u32 },
    /// `network.index`
    Direct { network: String },
    /// The pool has no power logger.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub prefix: String,
    pub class: PoolClass,
    pub cores: u32,
    pub address: AddressRule,
}

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("host {host} does not belong to a known pool")]
    UnknownClass { host: String },
    #[error("{class} host {host} has no telemetry address")]
    NoAddress { host: String, class: PoolClass },
    #[error("address for host {host} is out of range ({network}.{octet})")]
    OutOfRange {
        host: String,
        network: String,
        octet: u32,
    },
    #[error("invalid network prefix '{network}' for host {host}")]
    BadNetwork { host: String, network: String },
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to read cluster file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid cluster file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("prefix '{0}' appears more than once in cluster file")]
    DuplicatePrefix(String),
}

/// Lookup table from host prefix to pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolTable {
    entries: Vec<PoolEntry>,
}

impl Default for PoolTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PoolTable {
    /// The site defaults.
    pub fn builtin() -> Self {
        let network = "10.10.9".to_string();
        Self {
            entries: vec![
                PoolEntry {
                    prefix: "cn".into(),
                    class: PoolClass::Storage,
                    cores: 16,
                    address: AddressRule::None,
                },
                PoolEntry {
                    prefix: "dn".into(),
                    class: PoolClass::Compute,
                    cores: 28,
                    address: AddressRule::Offset {
                        network: network.clone(),
                        base: 100,
                    },
                },
                PoolEntry {
                    prefix: "dg".into(),
                    class: PoolClass::Gpu,
                    cores: 96,
                    address: AddressRule::Offset {
                        network: network.clone(),
                        base: 200,
                    },
                },
                PoolEntry {
                    prefix: "xm".into(),
                    class: PoolClass::HighMemory,
                    cores: 64,
                    address: AddressRule::Direct { network },
                },
            ],
        }
    }

    pub fn from_entries(entries: Vec<PoolEntry>) -> Result<Self, PoolError> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.prefix == entry.prefix) {
                return Err(PoolError::DuplicatePrefix(entry.prefix.clone()));
            }
        }
        Ok(Self { entries })
    }

    pub fn from_json_str(json: &str) -> Result<Self, PoolError> {
        let entries: Vec<PoolEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    pub fn from_json_file(path: &Utf8Path) -> Result<Self, PoolError> {
        let content = std::fs::read_to_string(path).map_err(|source| PoolError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn lookup(&self, host: &Host) -> Option<&PoolEntry> {
        let prefix = host.prefix()?;
        self.entries.iter().find(|e| e.prefix == prefix)
    }

    pub fn class(&self, host: &Host) -> Option<PoolClass> {
        self.lookup(host).map(|e| e.class)
    }

    /// Cores per node for the host's pool, 0 when the pool is unknown.
    pub fn cores(&self, host: &Host) -> u32 {
        self.lookup(host).map(|e| e.cores).unwrap_or(0)
    }

    /// Telemetry address of the host's power logger.
    pub fn address(&self, host: &Host) -> Result<Ipv4Addr, AddressError> {
        let entry = self.lookup(host).ok_or_else(|| AddressError::UnknownClass {
            host: host.to_string(),
        })?;
        // lookup() only succeeds for hosts that have parts()
        let index = host.index().unwrap_or(0);

        let (network, octet) = match &entry.address {
            AddressRule::Offset { network, base } => (network, base.saturating_add(index)),
            AddressRule::Direct { network } => (network, index),
            AddressRule::None => {
                return Err(AddressError::NoAddress {
                    host: host.to_string(),
                    class: entry.class,
                });
            }
        };

        let octet_u8 = u8::try_from(octet).map_err(|_| AddressError::OutOfRange {
            host: host.to_string(),
            network: network.clone(),
            octet,
        })?;

        let bad_network = || AddressError::BadNetwork {
            host: host.to_string(),
            network: network.clone(),
        };
        let head: Vec<u8> = network
            .split('.')
            .map(|p| p.parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| bad_network())?;
        let [a, b, c] = head[..] else {
            return Err(bad_network());
        };
        Ok(Ipv4Addr::new(a, b, c, octet_u8))
    }
}
