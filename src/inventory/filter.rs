//! Inventory filtering.
//!
//! A [`Selector`] is a conjunction of predicates built up with chained
//! calls. [`select`] applies it to an inventory without touching the
//! inventory itself and returns the matching devices in inventory order.
//!
//! Devices that pass every other predicate but whose platform has no registry
//! row for the requested transport are not silently dropped: they come back
//! in [`Selection::skipped`] so callers can report them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{Device, Inventory};
use crate::error::{Error, Result};
use crate::outcome::Skipped;
use crate::platform::{PlatformRegistry, TransportKind};

type Predicate = Arc<dyn Fn(&Device) -> bool + Send + Sync>;

/// Composable device predicate.
#[derive(Clone, Default)]
pub struct Selector {
    names: Option<HashSet<String>>,
    groups: Vec<String>,
    platforms: Option<HashSet<String>>,
    transport: Option<TransportKind>,
    canonical: Option<HashSet<String>>,
    predicates: Vec<Predicate>,
}

impl Selector {
    /// Match every device.
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep only devices whose name is in `names`.
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names
            .get_or_insert_with(HashSet::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Keep only members of `group`. Repeated calls require every group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Keep only devices whose raw platform tag is in `platforms`.
    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms
            .get_or_insert_with(HashSet::new)
            .extend(platforms.into_iter().map(Into::into));
        self
    }

    /// Keep only devices the registry can drive over `transport`.
    pub fn supported_for(mut self, transport: TransportKind) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Further restrict supported devices to these canonical platforms.
    /// Only meaningful together with [`supported_for`](Self::supported_for).
    pub fn canonical_in<I, S>(mut self, canonical: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canonical
            .get_or_insert_with(HashSet::new)
            .extend(canonical.into_iter().map(Into::into));
        self
    }

    /// Add a caller-supplied test, e.g. prior reachability.
    pub fn matching<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Device) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Transport this selector checks support for, if any.
    pub fn transport(&self) -> Option<TransportKind> {
        self.transport
    }

    fn matches_static(&self, device: &Device) -> bool {
        if let Some(names) = &self.names {
            if !names.contains(&device.name) {
                return false;
            }
        }
        if !self.groups.iter().all(|g| device.in_group(g)) {
            return false;
        }
        if let Some(platforms) = &self.platforms {
            if !platforms.contains(&device.platform) {
                return false;
            }
        }
        self.predicates.iter().all(|p| p(device))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("names", &self.names)
            .field("groups", &self.groups)
            .field("platforms", &self.platforms)
            .field("transport", &self.transport)
            .field("canonical", &self.canonical)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

/// Result of applying a [`Selector`].
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Eligible devices in inventory order
    pub devices: Vec<Arc<Device>>,
    /// Devices excluded for an unsupported platform
    pub skipped: Vec<Skipped>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Selected device names in order.
    pub fn names(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.name.as_str()).collect()
    }

    /// Fail on the first platform skip. Used when unknown platforms are
    /// treated as a configuration error.
    pub fn ensure_supported(&self) -> Result<()> {
        match self.skipped.first() {
            Some(skip) => Err(Error::UnsupportedPlatform {
                device: skip.device.clone(),
                platform: skip.platform.clone(),
                transport: skip.transport,
            }),
            None => Ok(()),
        }
    }

    /// Fail when nothing was selected.
    pub fn ensure_not_empty(&self, context: &str) -> Result<()> {
        if self.is_empty() {
            Err(Error::EmptySelection(context.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Apply `selector` to `inventory`.
///
/// Preserves inventory order, never mutates the inventory and returns an
/// empty selection rather than an error when nothing matches.
pub fn select(
    inventory: &Inventory,
    selector: &Selector,
    registry: &PlatformRegistry,
) -> Selection {
    let mut selection = Selection::default();

    for device in inventory.devices() {
        if !selector.matches_static(device) {
            continue;
        }

        if let Some(transport) = selector.transport {
            let supported = match registry.normalize(&device.platform, transport) {
                Some(canonical) => selector
                    .canonical
                    .as_ref()
                    .is_none_or(|allowed| allowed.contains(canonical)),
                None => false,
            };
            if !supported {
                warn!(
                    device = %device.name,
                    platform = %device.platform,
                    transport = %transport,
                    "Skipping device with unsupported platform"
                );
                selection.skipped.push(Skipped {
                    device: device.name.clone(),
                    platform: device.platform.clone(),
                    transport,
                });
                continue;
            }
        }

        selection.devices.push(Arc::clone(device));
    }

    debug!(
        selected = selection.len(),
        skipped = selection.skipped.len(),
        "Inventory filtered"
    );
    selection
}
