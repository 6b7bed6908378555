//! Reachability probing.
//!
//! Used to pre-filter devices before management-plane operations: probe
//! everything, then select only the reachable subset with
//! [`Selector::matching`](crate::inventory::Selector::matching).

use async_trait::async_trait;
use futures::future::join_all;
use indexmap::IndexMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::inventory::Device;

/// Answers "does this device respond?".
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self, device: &Device) -> bool;
}

/// ICMP echo through the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingProbe {
    /// Per-probe wait
    pub wait: Duration,
}

impl Default for PingProbe {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(2),
        }
    }
}

impl PingProbe {
    fn command(&self, address: &str) -> Command {
        let mut cmd = Command::new("ping");
        cmd.arg("-c")
            .arg("1")
            .arg("-W")
            .arg(self.wait.as_secs().max(1).to_string())
            .arg(address)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ReachabilityProbe for PingProbe {
    async fn is_reachable(&self, device: &Device) -> bool {
        // Outer bound in case ping ignores -W.
        let budget = self.wait + Duration::from_secs(1);
        let status = tokio::time::timeout(budget, self.command(device.address()).status()).await;
        match status {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                warn!(device = %device.name, error = %e, "ping could not be run");
                false
            }
            Err(_) => false,
        }
    }
}

/// Probe every device with at most `forks` probes in flight.
///
/// Returns device name -> reachable, in input order.
pub async fn probe_all(
    devices: &[Arc<Device>],
    probe: Arc<dyn ReachabilityProbe>,
    forks: usize,
) -> IndexMap<String, bool> {
    let semaphore = Arc::new(Semaphore::new(forks.max(1)));

    let checks = devices.iter().map(|device| {
        let probe = Arc::clone(&probe);
        let semaphore = Arc::clone(&semaphore);
        let device = Arc::clone(device);
        async move {
            let reachable = match semaphore.acquire().await {
                Ok(_permit) => probe.is_reachable(&device).await,
                Err(_) => false,
            };
            if reachable {
                debug!(device = %device.name, "Reachable");
            } else {
                warn!(device = %device.name, address = %device.address(), "Unreachable");
            }
            (device.name.clone(), reachable)
        }
    });

    join_all(checks).await.into_iter().collect()
}
