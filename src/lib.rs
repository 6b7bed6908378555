//! # netdispatch - Multi-protocol network device task dispatcher
//!
//! netdispatch runs one operation across many network devices concurrently.
//! Each device is reached over the transport the operation needs (RESTCONF
//! over HTTPS, CLI over SSH, or SNMP over UDP) and gets exactly one outcome;
//! a failure on one device never disturbs the others.
//!
//! ## Core Concepts
//!
//! - **Inventory**: named devices with an address, a raw platform tag,
//!   credentials and optional per-transport parameters
//! - **Platform registry**: maps (raw platform, transport) to the canonical
//!   identifier that transport understands
//! - **Selection**: the inventory subset an operation may run on
//! - **Operations**: RESTCONF PUT/GET, CLI config push, CLI command,
//!   running-config fetch and SNMP GET
//! - **Dispatcher**: bounded concurrent fan-out with per-device timeouts
//! - **Result set**: per-device outcomes plus platform skips
//!
//! ## Architecture Overview
//!
//! ```text
//!  Inventory ──► select(Selector, PlatformRegistry) ──► Selection
//!                                                          │
//!                                                          ▼
//!  DeviceOperation ────────────────────────────────► Dispatcher
//!   (RESTCONF / CLI / SNMP)                    (semaphore, timeout)
//!                                                          │
//!                                                          ▼
//!                                                      ResultSet ──► Reporter
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use netdispatch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let inventory = Inventory::load("hosts.yaml")?;
//!     let registry = Arc::new(PlatformRegistry::builtin());
//!
//!     let selector = Selector::all().supported_for(TransportKind::Cli);
//!     let selection = select(&inventory, &selector, &registry);
//!
//!     let connector = Arc::new(RusshCliConnector::new(SshSettings::default()));
//!     let operation = Arc::new(CliCommand::new(connector, "show ip interface brief"));
//!
//!     let dispatcher = Dispatcher::new(registry, DispatcherConfig::default());
//!     let results = dispatcher.run_selection(&selection, operation).await;
//!
//!     println!("{}", Reporter::plain(OutputMode::Human).render(&results));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod inventory;
pub mod operation;
pub mod outcome;
pub mod platform;
pub mod probe;
pub mod report;

pub use error::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::config::Config;
    pub use crate::dispatcher::{Dispatcher, DispatcherConfig};
    pub use crate::error::{Error, Result};
    pub use crate::inventory::{select, Device, Inventory, Selection, Selector};
    pub use crate::operation::{
        CliCommand, CliConfigPush, CliConnector, DeviceContext, DeviceOperation, FetchConfig,
        InterfaceConfig, Operation, RestconfClient, RestconfGet, RestconfPut, RusshCliConnector,
        SnmpClient, SnmpGet, SshSettings,
    };
    pub use crate::outcome::{Failure, FailureReason, Outcome, Payload, ResultSet};
    pub use crate::platform::{PlatformRegistry, TransportKind};
    pub use crate::probe::{PingProbe, ReachabilityProbe};
    pub use crate::report::{OutputMode, Reporter};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
