//! Inventory management for netdispatch.
//!
//! The inventory is an ordered set of [`Device`]s keyed by unique name. It is
//! loaded once per run from a Nornir-style hosts file (YAML or JSON) and is
//! read-only afterwards; devices are shared with running operations as
//! `Arc<Device>`.
//!
//! ```yaml
//! defaults:
//!   username: admin
//!   password: admin
//! RTR:
//!   hostname: 172.20.20.2
//!   platform: cisco_iol
//!   groups: [core]
//!   data:
//!     snmp_community: public
//! ```

pub mod device;
pub mod filter;

pub use device::{Credentials, Device, TransportParams};
pub use filter::{select, Selection, Selector};

use indexmap::IndexMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Reserved top-level key carrying per-file fallbacks.
const DEFAULTS_KEY: &str = "defaults";

/// The loaded device inventory.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    devices: IndexMap<String, Arc<Device>>,
    source: Option<PathBuf>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load inventory from a hosts file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::inventory_load(path, "file not found"));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::inventory_load(path, e.to_string()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let entries = match extension.as_str() {
            _ if content.trim().is_empty() => HostEntries(Vec::new()),
            "json" => serde_json::from_str::<HostEntries>(&content)
                .map_err(|e| Error::inventory_load(path, e.to_string()))?,
            _ => serde_yaml::from_str::<HostEntries>(&content)
                .map_err(|e| Error::inventory_load(path, e.to_string()))?,
        };

        let mut inventory = Self::from_entries(entries)?;
        inventory.source = Some(path.to_path_buf());
        debug!(
            path = %path.display(),
            devices = inventory.len(),
            "Loaded inventory"
        );
        Ok(inventory)
    }

    /// Parse a YAML hosts document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let entries: HostEntries = serde_yaml::from_str(content)?;
        Self::from_entries(entries)
    }

    /// Parse a JSON hosts document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let entries: HostEntries = serde_json::from_str(content)?;
        Self::from_entries(entries)
    }

    fn from_entries(entries: HostEntries) -> Result<Self> {
        let defaults = entries
            .0
            .iter()
            .find(|(name, _)| name == DEFAULTS_KEY)
            .map(|(_, entry)| entry.clone())
            .unwrap_or_default();

        let mut inventory = Self::new();
        for (name, entry) in entries.0 {
            if name == DEFAULTS_KEY {
                continue;
            }
            inventory.add_device(entry.into_device(name, &defaults))?;
        }
        Ok(inventory)
    }

    /// Add a device. Names must be unique.
    pub fn add_device(&mut self, device: Device) -> Result<()> {
        if self.devices.contains_key(&device.name) {
            return Err(Error::DuplicateDevice(device.name));
        }
        self.devices.insert(device.name.clone(), Arc::new(device));
        Ok(())
    }

    /// Get a device by name
    pub fn get(&self, name: &str) -> Option<&Arc<Device>> {
        self.devices.get(name)
    }

    /// Get a device by name, or fail with `DeviceNotFound`.
    pub fn require(&self, name: &str) -> Result<&Arc<Device>> {
        self.get(name)
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))
    }

    /// Devices in file order.
    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    /// Device names in file order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// All group names referenced by devices.
    pub fn groups(&self) -> BTreeSet<&str> {
        self.devices
            .values()
            .flat_map(|d| d.groups.iter().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// File the inventory was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl FromIterator<Device> for Inventory {
    /// Later devices with a repeated name are dropped.
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        let mut inventory = Self::new();
        for device in iter {
            let name = device.name.clone();
            if let Err(e) = inventory.add_device(device) {
                warn!(device = %name, error = %e, "Duplicate device dropped");
            }
        }
        inventory
    }
}

// ============================================================================
// Hosts file parsing
// ============================================================================

/// One entry of the hosts file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct HostEntry {
    hostname: Option<String>,
    platform: Option<String>,
    username: Option<String>,
    password: Option<String>,
    password_env: Option<String>,
    port: Option<u16>,
    groups: Vec<String>,
    data: IndexMap<String, serde_yaml::Value>,
}

impl HostEntry {
    fn into_device(self, name: String, defaults: &HostEntry) -> Device {
        let mut credentials = Credentials {
            username: self.username,
            password: self.password,
            password_env: self.password_env,
        };
        credentials.fill_from(&Credentials {
            username: defaults.username.clone(),
            password: defaults.password.clone(),
            password_env: defaults.password_env.clone(),
        });

        let mut data = defaults.data.clone();
        data.extend(self.data);

        let params = TransportParams {
            ssh_port: self.port.or(defaults.port),
            restconf_port: data_port(&data, "restconf_port"),
            snmp_port: data_port(&data, "snmp_port"),
            snmp_community: data
                .get("snmp_community")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };

        let platform = self
            .platform
            .or_else(|| defaults.platform.clone())
            .unwrap_or_default();

        Device {
            hostname: self.hostname.unwrap_or_else(|| name.clone()),
            name,
            platform,
            credentials,
            params,
            groups: self.groups,
            data,
        }
    }
}

fn data_port(data: &IndexMap<String, serde_yaml::Value>, key: &str) -> Option<u16> {
    data.get(key)
        .and_then(|v| v.as_u64())
        .and_then(|p| u16::try_from(p).ok())
}

/// Hosts-file entries in document order, duplicates kept so they can be
/// reported instead of silently overwritten.
struct HostEntries(Vec<(String, HostEntry)>);

impl<'de> Deserialize<'de> for HostEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = HostEntries;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a mapping of device name to device definition")
            }

            fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(HostEntries(Vec::new()))
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, entry)) = map.next_entry::<String, Option<HostEntry>>()? {
                    entries.push((name, entry.unwrap_or_default()));
                }
                Ok(HostEntries(entries))
            }
        }

        deserializer.deserialize_any(EntriesVisitor)
    }
}
