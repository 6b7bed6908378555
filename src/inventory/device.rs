//! Device definition for the netdispatch inventory.
//!
//! A [`Device`] is created once at inventory load and never mutated after.
//! Anything derived per operation (the canonical platform, for one) lives in
//! [`DeviceContext`](crate::operation::DeviceContext) instead.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Login credentials for a device
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Inline password (lab use)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Name of an environment variable holding the password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl Credentials {
    /// Create credentials with an inline password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            password_env: None,
        }
    }

    /// Resolve the secret. The environment reference wins over the inline value.
    pub fn secret(&self) -> Option<String> {
        self.password_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .or_else(|| self.password.clone())
    }

    /// Username, or an empty string when none is configured.
    pub fn user(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }

    /// Fill unset fields from `defaults`.
    pub fn fill_from(&mut self, defaults: &Credentials) {
        if self.username.is_none() {
            self.username = defaults.username.clone();
        }
        if self.password.is_none() && self.password_env.is_none() {
            self.password = defaults.password.clone();
            self.password_env = defaults.password_env.clone();
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("password_env", &self.password_env)
            .finish()
    }
}

/// Transport-specific overrides. Unset fields fall back to configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportParams {
    /// SSH port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<u16>,

    /// RESTCONF HTTPS port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restconf_port: Option<u16>,

    /// SNMP agent UDP port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snmp_port: Option<u16>,

    /// SNMP community string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snmp_community: Option<String>,
}

/// A managed network device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Unique inventory name
    pub name: String,

    /// Management address (hostname or IP)
    pub hostname: String,

    /// Raw platform tag as declared in the inventory
    pub platform: String,

    /// Login credentials
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Transport overrides
    #[serde(default)]
    pub params: TransportParams,

    /// Groups this device belongs to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Free-form data from the inventory
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data: IndexMap<String, serde_yaml::Value>,
}

impl Device {
    /// Create a new device.
    pub fn new(
        name: impl Into<String>,
        hostname: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            hostname: hostname.into(),
            platform: platform.into(),
            credentials: Credentials::default(),
            params: TransportParams::default(),
            groups: Vec::new(),
            data: IndexMap::new(),
        }
    }

    /// Builder-style credentials setter.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Builder-style transport params setter.
    pub fn with_params(mut self, params: TransportParams) -> Self {
        self.params = params;
        self
    }

    /// Builder-style group membership.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Address to connect to.
    pub fn address(&self) -> &str {
        if self.hostname.is_empty() {
            &self.name
        } else {
            &self.hostname
        }
    }

    /// Check if device belongs to a specific group
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Get a data value
    pub fn get_data(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.data.get(key)
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Device {}

impl std::hash::Hash for Device {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.address())
    }
}
