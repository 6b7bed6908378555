//! Reachability commands
//!
//! Implements the `ping` and `check-connectivity` subcommands.

use super::{CommandContext, EXIT_FAILED, EXIT_OK};
use anyhow::Result;
use clap::Parser;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use netdispatch::operation::{CliCommand, RusshCliConnector};
use netdispatch::platform::TransportKind;
use netdispatch::probe::{probe_all, PingProbe, ReachabilityProbe};
use netdispatch::report::OutputMode;

/// Command sent to reachable devices by check-connectivity.
pub const CONNECTIVITY_COMMAND: &str = "show ip interface brief";

/// Arguments for ping command
#[derive(Parser, Debug, Clone)]
pub struct PingArgs {
    /// Seconds to wait for each echo reply
    #[arg(long, default_value = "2")]
    pub wait: u64,
}

impl PingArgs {
    /// Execute the ping command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let inventory = ctx.load_inventory()?;
        let selection = ctx.select(&inventory, &ctx.selector())?;

        let probe: Arc<dyn ReachabilityProbe> = Arc::new(PingProbe {
            wait: Duration::from_secs(self.wait),
        });
        let reachability = probe_all(&selection.devices, probe, ctx.config.defaults.forks).await;

        print!("{}", ctx.reporter.render_reachability(&reachability));
        if reachability.values().all(|reachable| *reachable) {
            Ok(EXIT_OK)
        } else {
            Ok(EXIT_FAILED)
        }
    }
}

/// Arguments for check-connectivity command
#[derive(Parser, Debug, Clone)]
pub struct CheckConnectivityArgs {
    /// Seconds to wait for each echo reply
    #[arg(long, default_value = "2")]
    pub wait: u64,
}

impl CheckConnectivityArgs {
    /// Execute the check-connectivity command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let inventory = ctx.load_inventory()?;
        let candidates = ctx.select(&inventory, &ctx.selector())?;

        let probe: Arc<dyn ReachabilityProbe> = Arc::new(PingProbe {
            wait: Duration::from_secs(self.wait),
        });
        let reachability = probe_all(&candidates.devices, probe, ctx.config.defaults.forks).await;
        let reachable: HashSet<String> = reachability
            .iter()
            .filter(|(_, up)| **up)
            .map(|(name, _)| name.clone())
            .collect();

        if ctx.reporter.mode() == OutputMode::Human {
            print!("{}", ctx.reporter.render_reachability(&reachability));
        }
        if reachable.is_empty() {
            eprintln!("No devices reachable - check routing configuration");
            return Ok(EXIT_FAILED);
        }
        info!(
            reachable = reachable.len(),
            probed = reachability.len(),
            "Reachability checked"
        );

        let selector = ctx
            .selector()
            .supported_for(TransportKind::Cli)
            .matching(move |device| reachable.contains(&device.name));
        let connector = Arc::new(RusshCliConnector::new(ctx.config.ssh.settings()));
        ctx.dispatch_with(selector, CliCommand::new(connector, CONNECTIVITY_COMMAND).into())
            .await
    }
}
