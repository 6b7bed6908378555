//! Bounded, isolated execution of one operation across many devices.
//!
//! Each device runs in its own tokio task, gated by a semaphore sized to the
//! configured fork count. A device's task owns everything it touches; results
//! come back through the task's join handle, so there is no shared mutable
//! state between devices. A panicking task or one that overruns the timeout
//! still yields a terminal [`Outcome`] for its device.
//!
//! Per device:
//!
//! ```text
//! Pending -> Executing -> Succeeded | Failed
//! ```

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, instrument, warn};

use crate::inventory::{Device, Selection};
use crate::operation::{DeviceContext, DeviceOperation};
use crate::outcome::{Failure, Outcome, ResultSet, Skipped};
use crate::platform::PlatformRegistry;

/// Dispatcher settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum devices in flight
    pub forks: usize,
    /// Time budget per device
    pub timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            forks: 5,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Per-device state within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Pending,
    Executing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Pending => write!(f, "pending"),
            DeviceState::Executing => write!(f, "executing"),
            DeviceState::Succeeded => write!(f, "succeeded"),
            DeviceState::Failed => write!(f, "failed"),
        }
    }
}

/// Runs operations across devices.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<PlatformRegistry>,
    config: DispatcherConfig,
    semaphore: Arc<Semaphore>,
}

impl Dispatcher {
    /// Create a dispatcher. A fork count of zero is treated as one.
    pub fn new(registry: Arc<PlatformRegistry>, config: DispatcherConfig) -> Self {
        let forks = config.forks.max(1);
        Self {
            registry,
            semaphore: Arc::new(Semaphore::new(forks)),
            config: DispatcherConfig { forks, ..config },
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Run `operation` across a filtered selection. Skips recorded by the
    /// filter are carried into the result set.
    pub async fn run_selection(
        &self,
        selection: &Selection,
        operation: Arc<dyn DeviceOperation>,
    ) -> ResultSet {
        let mut results = self.run(&selection.devices, operation).await;
        for skip in &selection.skipped {
            if !results.skipped.contains(skip) {
                results.skip(skip.clone());
            }
        }
        results
    }

    /// Run `operation` against every device in `devices`.
    ///
    /// One entry per device whose platform normalizes for the operation's
    /// transport, in the order given. Devices that do not normalize are
    /// recorded as skipped. Never fails as a whole.
    #[instrument(skip_all, fields(operation = %operation.name(), devices = devices.len()))]
    pub async fn run(
        &self,
        devices: &[Arc<Device>],
        operation: Arc<dyn DeviceOperation>,
    ) -> ResultSet {
        let transport = operation.transport();
        let mut results = ResultSet::new(operation.name(), transport);

        let mut contexts = Vec::with_capacity(devices.len());
        for device in devices {
            match self.registry.normalize(&device.platform, transport) {
                Some(canonical) => {
                    debug!(device = %device.name, state = %DeviceState::Pending, "Queued");
                    contexts.push(DeviceContext::new(Arc::clone(device), canonical, transport));
                }
                None => {
                    warn!(
                        device = %device.name,
                        platform = %device.platform,
                        transport = %transport,
                        "Skipping device with unsupported platform"
                    );
                    results.skip(Skipped {
                        device: device.name.clone(),
                        platform: device.platform.clone(),
                        transport,
                    });
                }
            }
        }

        info!(
            operation = %operation.name(),
            devices = contexts.len(),
            forks = self.config.forks,
            "Dispatching"
        );

        let names: Vec<String> = contexts.iter().map(|c| c.name().to_string()).collect();
        let handles: Vec<_> = contexts
            .into_iter()
            .map(|ctx| {
                let operation = Arc::clone(&operation);
                let semaphore = Arc::clone(&self.semaphore);
                let timeout = self.config.timeout;
                tokio::spawn(async move { run_device(ctx, operation, semaphore, timeout).await })
            })
            .collect();

        let joined = join_all(handles).await;

        for (name, joined) in names.into_iter().zip(joined) {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let outcome: Outcome =
                        Failure::unexpected(format!("device task aborted: {}", e)).into();
                    log_terminal(&name, &outcome);
                    outcome
                }
            };
            results.record(name, outcome);
        }

        results.finish();
        results
    }
}

/// Drive one device from `Pending` to a terminal state.
async fn run_device(
    ctx: DeviceContext,
    operation: Arc<dyn DeviceOperation>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
) -> Outcome {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return Failure::unexpected("dispatcher shut down").into(),
    };

    let outcome = match operation.preflight(&ctx) {
        Err(failure) => failure.into(),
        Ok(()) => {
            debug!(device = %ctx.name(), state = %DeviceState::Executing, "Executing");
            match tokio::time::timeout(timeout, operation.execute(&ctx, timeout)).await {
                Ok(outcome) => outcome,
                Err(_) => Failure::timeout(format!(
                    "{} did not finish within {}s",
                    operation.name(),
                    timeout.as_secs_f32()
                ))
                .into(),
            }
        }
    };

    log_terminal(ctx.name(), &outcome);
    outcome
}

fn log_terminal(device: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Success(_) => {
            info!(device = %device, state = %DeviceState::Succeeded, "Device succeeded")
        }
        Outcome::Failure(f) => error!(
            device = %device,
            state = %DeviceState::Failed,
            reason = %f.reason,
            detail = %f.detail,
            "Device failed"
        ),
    }
}
