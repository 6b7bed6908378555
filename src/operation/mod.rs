//! Device operations.
//!
//! A [`DeviceOperation`] is one unit of work against one device over one
//! transport. Every variant converts its own errors into an [`Outcome`], so
//! `execute` cannot fail: the dispatcher only ever sees terminal results.
//!
//! Variants:
//! - [`RestconfPut`] / [`RestconfGet`]: interface configuration over RESTCONF
//! - [`CliConfigPush`] / [`CliCommand`] / [`FetchConfig`]: CLI over SSH
//! - [`SnmpGet`]: SNMP GET of one or more identifiers
//!
//! [`Operation`] is the tagged union over all of them.

pub mod cli;
pub mod restconf;
pub mod snmp;

pub use cli::{
    snmp_enable_commands, CliCommand, CliConfigPush, CliConnector, CliTarget, ConfigSource,
    FetchConfig, RusshCliConnector, SshSettings,
};
pub use restconf::{InterfaceConfig, RestconfClient, RestconfGet, RestconfPut, RestconfSettings};
pub use snmp::{
    AsyncSnmpClient, ErrorIndication, ObjectIdentifier, SnmpClient, SnmpErrorStatus, SnmpGet,
    SnmpResponse, SnmpSettings, SnmpTarget,
};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::inventory::Device;
use crate::outcome::{Failure, Outcome};
use crate::platform::TransportKind;

/// Per-operation, per-device view handed to an operation.
///
/// Derived by the dispatcher for each run. The canonical platform lives here
/// rather than on the shared [`Device`].
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub device: Arc<Device>,
    pub canonical_platform: String,
    pub transport: TransportKind,
}

impl DeviceContext {
    pub fn new(
        device: Arc<Device>,
        canonical_platform: impl Into<String>,
        transport: TransportKind,
    ) -> Self {
        Self {
            device,
            canonical_platform: canonical_platform.into(),
            transport,
        }
    }

    /// Device name
    pub fn name(&self) -> &str {
        &self.device.name
    }

    /// Management address
    pub fn address(&self) -> &str {
        self.device.address()
    }
}

/// A unit of work runnable against a single device.
#[async_trait]
pub trait DeviceOperation: Send + Sync {
    /// Short operation name used in logs and reports.
    fn name(&self) -> &str;

    /// Transport the operation runs over; selects the registry column.
    fn transport(&self) -> TransportKind;

    /// Local checks run before any session is opened. A failure here means
    /// the device is never contacted.
    fn preflight(&self, _ctx: &DeviceContext) -> Result<(), Failure> {
        Ok(())
    }

    /// Run against one device. Must always return a terminal outcome.
    async fn execute(&self, ctx: &DeviceContext, timeout: Duration) -> Outcome;
}

/// Tagged union over every operation variant.
pub enum Operation {
    RestconfPut(RestconfPut),
    RestconfGet(RestconfGet),
    CliConfigPush(CliConfigPush),
    CliCommand(CliCommand),
    FetchConfig(FetchConfig),
    SnmpGet(SnmpGet),
}

impl Operation {
    fn inner(&self) -> &dyn DeviceOperation {
        match self {
            Operation::RestconfPut(op) => op,
            Operation::RestconfGet(op) => op,
            Operation::CliConfigPush(op) => op,
            Operation::CliCommand(op) => op,
            Operation::FetchConfig(op) => op,
            Operation::SnmpGet(op) => op,
        }
    }
}

#[async_trait]
impl DeviceOperation for Operation {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn transport(&self) -> TransportKind {
        self.inner().transport()
    }

    fn preflight(&self, ctx: &DeviceContext) -> Result<(), Failure> {
        self.inner().preflight(ctx)
    }

    async fn execute(&self, ctx: &DeviceContext, timeout: Duration) -> Outcome {
        self.inner().execute(ctx, timeout).await
    }
}

impl From<RestconfPut> for Operation {
    fn from(op: RestconfPut) -> Self {
        Operation::RestconfPut(op)
    }
}

impl From<RestconfGet> for Operation {
    fn from(op: RestconfGet) -> Self {
        Operation::RestconfGet(op)
    }
}

impl From<CliConfigPush> for Operation {
    fn from(op: CliConfigPush) -> Self {
        Operation::CliConfigPush(op)
    }
}

impl From<CliCommand> for Operation {
    fn from(op: CliCommand) -> Self {
        Operation::CliCommand(op)
    }
}

impl From<FetchConfig> for Operation {
    fn from(op: FetchConfig) -> Self {
        Operation::FetchConfig(op)
    }
}

impl From<SnmpGet> for Operation {
    fn from(op: SnmpGet) -> Self {
        Operation::SnmpGet(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Payload, TransportError};
    use std::path::PathBuf;

    struct NullConnector;

    #[async_trait]
    impl CliConnector for NullConnector {
        async fn send_command(
            &self,
            _target: &CliTarget,
            command: &str,
        ) -> Result<String, TransportError> {
            Ok(format!("{}\nok", command))
        }

        async fn send_config(
            &self,
            _target: &CliTarget,
            _lines: &[String],
        ) -> Result<String, TransportError> {
            Ok(String::new())
        }
    }

    fn ctx() -> DeviceContext {
        DeviceContext::new(
            Arc::new(Device::new("RTR", "172.20.20.2", "cisco_iol")),
            "cisco_ios",
            TransportKind::Cli,
        )
    }

    #[test]
    fn test_context_accessors() {
        let ctx = ctx();
        assert_eq!(ctx.name(), "RTR");
        assert_eq!(ctx.address(), "172.20.20.2");
        assert_eq!(ctx.canonical_platform, "cisco_ios");
    }

    #[tokio::test]
    async fn test_operation_delegates() {
        let op: Operation = CliCommand::new(Arc::new(NullConnector), "show version").into();
        assert_eq!(op.name(), "cli-command");
        assert_eq!(op.transport(), TransportKind::Cli);

        let outcome = op.execute(&ctx(), Duration::from_secs(1)).await;
        assert_eq!(
            outcome,
            Outcome::Success(Payload::Text("show version\nok".into()))
        );
    }

    #[test]
    fn test_operation_preflight_delegates() {
        let op: Operation = CliConfigPush::new(
            Arc::new(NullConnector),
            ConfigSource::File(PathBuf::from("/nonexistent/r1.ios")),
        )
        .into();
        let failure = op.preflight(&ctx()).unwrap_err();
        assert_eq!(failure.reason, crate::outcome::FailureReason::ConfigNotFound);
    }
}
