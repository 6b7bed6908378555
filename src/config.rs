//! Configuration for netdispatch
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - Project configuration (./netdispatch.toml, ./netdispatch.yaml)
//! - An explicit file (`--config` or `NETDISPATCH_CONFIG`)
//! - Environment variables
//!
//! Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatcher::DispatcherConfig;
use crate::error::{Error, Result};
use crate::operation::{RestconfSettings, SnmpSettings, SshSettings};
use crate::platform::{PlatformMapping, PlatformRegistry};

/// Files checked in the working directory when no explicit path is given.
const PROJECT_CONFIG_FILES: &[&str] = &["netdispatch.toml", "netdispatch.yaml", "netdispatch.yml"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run defaults
    pub defaults: Defaults,

    /// RESTCONF transport settings
    pub restconf: RestconfSettings,

    /// SSH transport settings
    pub ssh: SshConfig,

    /// SNMP transport settings
    pub snmp: SnmpSettings,

    /// Extra platform registry rows
    pub platforms: Vec<PlatformMapping>,
}

/// Default run values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Default inventory path
    pub inventory: Option<PathBuf>,

    /// Maximum concurrent device sessions
    pub forks: usize,

    /// Per-device timeout in seconds
    pub timeout: u64,

    /// Treat unknown platforms as a run error instead of a skip
    pub strict_platforms: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            inventory: None,
            forks: 5,
            timeout: 10,
            strict_platforms: false,
        }
    }
}

/// SSH section: connector settings plus config file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Port used when the device does not override it
    pub port: u16,

    /// Accept host keys missing from known_hosts
    pub accept_unknown_hosts: bool,

    /// Directory holding per-device config files for push-config
    pub config_dir: PathBuf,

    /// Directory fetched running configs are written to
    pub output_dir: PathBuf,
}

impl Default for SshConfig {
    fn default() -> Self {
        let settings = SshSettings::default();
        Self {
            port: settings.port,
            accept_unknown_hosts: settings.accept_unknown_hosts,
            config_dir: PathBuf::from("configs"),
            output_dir: PathBuf::from("fetched_configs"),
        }
    }
}

impl SshConfig {
    /// Connector settings for this section.
    pub fn settings(&self) -> SshSettings {
        SshSettings {
            port: self.port,
            accept_unknown_hosts: self.accept_unknown_hosts,
        }
    }
}

/// `other` unless it still holds the default value.
fn prefer<T: PartialEq + Clone>(other: T, base: &T, default: &T) -> T {
    if other != *default {
        other
    } else {
        base.clone()
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        let explicit = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("NETDISPATCH_CONFIG").map(PathBuf::from));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config_load(&path, "file not found"));
                }
                config = config.merge_from_file(&path)?;
            }
            None => {
                for name in PROJECT_CONFIG_FILES {
                    let path = PathBuf::from(name);
                    if path.exists() {
                        config = config.merge_from_file(&path)?;
                    }
                }
            }
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a specific file, without environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_load(path, format!("cannot read: {}", e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .map_err(|e| Error::config_load(path, e.to_string()))?,
            "toml" => toml::from_str(&content).map_err(|e| Error::config_load(path, e.to_string()))?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .map_err(|e| Error::config_load(path, e.to_string()))?,
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one; non-default values in `other` win.
    fn merge(&self, other: Config) -> Config {
        let dd = Defaults::default();
        let rd = RestconfSettings::default();
        let sd = SshConfig::default();
        let nd = SnmpSettings::default();

        Config {
            defaults: Defaults {
                inventory: other
                    .defaults
                    .inventory
                    .or_else(|| self.defaults.inventory.clone()),
                forks: prefer(other.defaults.forks, &self.defaults.forks, &dd.forks),
                timeout: prefer(other.defaults.timeout, &self.defaults.timeout, &dd.timeout),
                strict_platforms: other.defaults.strict_platforms || self.defaults.strict_platforms,
            },
            restconf: RestconfSettings {
                port: prefer(other.restconf.port, &self.restconf.port, &rd.port),
                scheme: prefer(other.restconf.scheme, &self.restconf.scheme, &rd.scheme),
                validate_certs: other.restconf.validate_certs && self.restconf.validate_certs,
            },
            ssh: SshConfig {
                port: prefer(other.ssh.port, &self.ssh.port, &sd.port),
                accept_unknown_hosts: prefer(
                    other.ssh.accept_unknown_hosts,
                    &self.ssh.accept_unknown_hosts,
                    &sd.accept_unknown_hosts,
                ),
                config_dir: prefer(other.ssh.config_dir, &self.ssh.config_dir, &sd.config_dir),
                output_dir: prefer(other.ssh.output_dir, &self.ssh.output_dir, &sd.output_dir),
            },
            snmp: SnmpSettings {
                port: prefer(other.snmp.port, &self.snmp.port, &nd.port),
                community: prefer(other.snmp.community, &self.snmp.community, &nd.community),
                retries: prefer(other.snmp.retries, &self.snmp.retries, &nd.retries),
            },
            platforms: {
                let mut rows = self.platforms.clone();
                rows.extend(other.platforms);
                rows
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // NETDISPATCH_INVENTORY
        if let Ok(path) = std::env::var("NETDISPATCH_INVENTORY") {
            self.defaults.inventory = Some(PathBuf::from(path));
        }

        // NETDISPATCH_FORKS
        if let Ok(forks) = std::env::var("NETDISPATCH_FORKS") {
            if let Ok(n) = forks.parse() {
                self.defaults.forks = n;
            }
        }

        // NETDISPATCH_TIMEOUT
        if let Ok(timeout) = std::env::var("NETDISPATCH_TIMEOUT") {
            if let Ok(n) = timeout.parse() {
                self.defaults.timeout = n;
            }
        }

        // NETDISPATCH_SNMP_COMMUNITY
        if let Ok(community) = std::env::var("NETDISPATCH_SNMP_COMMUNITY") {
            self.snmp.community = community;
        }

        // NETDISPATCH_INSECURE
        if std::env::var("NETDISPATCH_INSECURE").is_ok() {
            self.restconf.validate_certs = false;
        }
    }

    /// Get the effective inventory path
    pub fn inventory_path(&self) -> Option<&PathBuf> {
        self.defaults.inventory.as_ref()
    }

    /// Dispatcher settings derived from the defaults section.
    pub fn dispatcher(&self) -> DispatcherConfig {
        DispatcherConfig {
            forks: self.defaults.forks.max(1),
            timeout: Duration::from_secs(self.defaults.timeout.max(1)),
        }
    }

    /// Built-in registry extended with the configured rows.
    pub fn registry(&self) -> PlatformRegistry {
        PlatformRegistry::with_mappings(&self.platforms)
    }
}
