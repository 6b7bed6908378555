//! Error types for netdispatch.
//!
//! Run-level errors live here. Per-device problems are never raised as
//! [`Error`]; they are captured as [`Failure`](crate::outcome::Failure)
//! values inside a [`ResultSet`](crate::outcome::ResultSet).

use std::path::PathBuf;
use thiserror::Error;

use crate::platform::TransportKind;

/// Result type alias for netdispatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for netdispatch.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Inventory Errors
    // ========================================================================
    /// Error loading inventory.
    #[error("Failed to load inventory from '{path}': {message}")]
    InventoryLoad {
        /// Path to inventory
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Two devices share a name.
    #[error("Duplicate device '{0}' in inventory")]
    DuplicateDevice(String),

    /// Device not found in inventory.
    #[error("Device '{0}' not found in inventory")]
    DeviceNotFound(String),

    // ========================================================================
    // Selection Errors
    // ========================================================================
    /// A device's platform has no registry entry and strict mode is on.
    #[error("Device '{device}' has unsupported platform '{platform}' for {transport}")]
    UnsupportedPlatform {
        /// Device name
        device: String,
        /// Raw platform tag
        platform: String,
        /// Transport that was requested
        transport: TransportKind,
    },

    /// Nothing matched the selection.
    #[error("No devices selected: {0}")]
    EmptySelection(String),

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// Invalid operation parameters supplied by the caller.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failed to build an HTTP client.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Error loading configuration.
    #[error("Failed to load config from '{path}': {message}")]
    ConfigLoad {
        /// Path to config file
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // I/O and Parsing Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Creates a new inventory load error.
    pub fn inventory_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InventoryLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new config load error.
    pub fn config_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::EmptySelection(_) | Error::UnsupportedPlatform { .. } => 2,
            Error::ConfigLoad { .. } | Error::TomlParse(_) => 4,
            Error::InventoryLoad { .. }
            | Error::DuplicateDevice(_)
            | Error::DeviceNotFound(_) => 5,
            _ => 1,
        }
    }
}
