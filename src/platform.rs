//! Platform registry.
//!
//! Inventories describe devices with the tag of whatever launched them (a
//! containerlab node kind such as `cisco_iol`). Each transport wants its own
//! dialect name for the same box: the SSH driver wants `cisco_ios`, the
//! RESTCONF layer wants `cisco_iosxe`. The [`PlatformRegistry`] is the lookup
//! table between the two, keyed by `(raw tag, transport)`.
//!
//! A missing row is not an error. It means "this device cannot be driven over
//! this transport" and the inventory filter turns it into a skip.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The management-plane transport an operation runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// RESTCONF over HTTPS
    Restconf,
    /// Interactive CLI over SSH
    Cli,
    /// SNMP over UDP
    Snmp,
}

impl TransportKind {
    /// All transports, in display order.
    pub const ALL: [TransportKind; 3] = [
        TransportKind::Restconf,
        TransportKind::Cli,
        TransportKind::Snmp,
    ];
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Restconf => write!(f, "restconf"),
            TransportKind::Cli => write!(f, "cli"),
            TransportKind::Snmp => write!(f, "snmp"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "restconf" | "rest" | "http" => Ok(TransportKind::Restconf),
            "cli" | "ssh" => Ok(TransportKind::Cli),
            "snmp" => Ok(TransportKind::Snmp),
            _ => Err(format!(
                "Unknown transport: {}. Valid options: restconf, cli, snmp",
                s
            )),
        }
    }
}

/// One registry row, as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMapping {
    /// Raw inventory tag
    pub raw: String,
    /// Transport the mapping applies to
    pub transport: TransportKind,
    /// Canonical identifier handed to the transport
    pub canonical: String,
}

/// Built-in rows for the lab node kinds we know how to drive.
const BUILTIN: &[(&str, TransportKind, &str)] = &[
    ("arista_ceos", TransportKind::Cli, "arista_eos"),
    ("cisco_iol", TransportKind::Cli, "cisco_ios"),
    ("cisco_iol", TransportKind::Snmp, "cisco_ios"),
    ("cisco_csr1000v", TransportKind::Cli, "cisco_ios"),
    ("cisco_csr1000v", TransportKind::Restconf, "cisco_iosxe"),
    ("cisco_c8000v", TransportKind::Cli, "cisco_ios"),
    ("cisco_c8000v", TransportKind::Restconf, "cisco_iosxe"),
];

/// Lookup table from `(raw platform, transport)` to a canonical identifier.
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    entries: HashMap<(String, TransportKind), String>,
}

impl PlatformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry preloaded with the built-in lab platforms.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (raw, transport, canonical) in BUILTIN {
            registry.register(*raw, *transport, *canonical);
        }
        registry
    }

    /// Create the built-in registry extended with configured rows.
    ///
    /// Configured rows replace built-in rows with the same key.
    pub fn with_mappings<'a>(mappings: impl IntoIterator<Item = &'a PlatformMapping>) -> Self {
        let mut registry = Self::builtin();
        for mapping in mappings {
            registry.register(
                mapping.raw.clone(),
                mapping.transport,
                mapping.canonical.clone(),
            );
        }
        registry
    }

    /// Add or replace a row.
    pub fn register(
        &mut self,
        raw: impl Into<String>,
        transport: TransportKind,
        canonical: impl Into<String>,
    ) {
        self.entries
            .insert((raw.into(), transport), canonical.into());
    }

    /// Map a raw platform tag to the canonical identifier for `transport`.
    pub fn normalize(&self, raw: &str, transport: TransportKind) -> Option<&str> {
        self.entries
            .get(&(raw.to_string(), transport))
            .map(String::as_str)
    }

    /// Whether `raw` can be driven over `transport`.
    pub fn supports(&self, raw: &str, transport: TransportKind) -> bool {
        self.normalize(raw, transport).is_some()
    }

    /// Raw tags supported for `transport`, sorted.
    pub fn supported_platforms(&self, transport: TransportKind) -> BTreeSet<&str> {
        self.entries
            .keys()
            .filter(|(_, t)| *t == transport)
            .map(|(raw, _)| raw.as_str())
            .collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
