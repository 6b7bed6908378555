//! Subcommands for the netdispatch CLI
//!
//! Every dispatching command follows the same path: load the inventory,
//! select devices for the operation's transport, run, print, exit code.

pub mod cli;
pub mod inventory;
pub mod reachability;
pub mod restconf;
pub mod snmp;

use anyhow::Result;
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use netdispatch::config::Config;
use netdispatch::dispatcher::Dispatcher;
use netdispatch::inventory::{select, Inventory, Selection, Selector};
use netdispatch::operation::{DeviceOperation, Operation};
use netdispatch::outcome::ResultSet;
use netdispatch::platform::PlatformRegistry;
use netdispatch::report::Reporter;
use netdispatch::Error;

/// Exit status when every dispatched device succeeded.
pub const EXIT_OK: i32 = 0;
/// Exit status when any device failed or nothing was selected.
pub const EXIT_FAILED: i32 = 2;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration with CLI overrides applied
    pub config: Config,
    /// Output renderer
    pub reporter: Reporter,
    /// Platform registry (built-in plus configured rows)
    pub registry: Arc<PlatformRegistry>,
    /// Verbosity level
    pub verbosity: u8,
    /// Device names from `--limit`
    pub limit: Vec<String>,
    /// Group from `--group`
    pub group: Option<String>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, mut config: Config) -> Self {
        if let Some(path) = &cli.inventory {
            config.defaults.inventory = Some(path.clone());
        }
        if let Some(forks) = cli.forks {
            config.defaults.forks = forks;
        }
        if let Some(timeout) = cli.timeout {
            config.defaults.timeout = timeout;
        }
        if cli.insecure {
            config.restconf.validate_certs = false;
        }
        if cli.strict_platforms {
            config.defaults.strict_platforms = true;
        }

        let reporter = Reporter::new(!cli.no_color, cli.output.into());
        let registry = Arc::new(config.registry());

        Self {
            config,
            reporter,
            registry,
            verbosity: cli.verbosity(),
            limit: cli.limit.clone(),
            group: cli.group.clone(),
        }
    }

    /// Load the inventory named by `-i`, the environment or the config.
    pub fn load_inventory(&self) -> netdispatch::Result<Inventory> {
        let path = self
            .config
            .inventory_path()
            .cloned()
            .unwrap_or_else(|| PathBuf::from("hosts.yaml"));
        let inventory = Inventory::load(&path)?;
        debug!(path = %path.display(), devices = inventory.len(), "Inventory loaded");
        Ok(inventory)
    }

    /// Base selector from `--limit` and `--group`.
    pub fn selector(&self) -> Selector {
        let mut selector = Selector::all();
        if !self.limit.is_empty() {
            selector = selector.names(self.limit.iter().cloned());
        }
        if let Some(group) = &self.group {
            selector = selector.group(group.clone());
        }
        selector
    }

    /// Apply `selector`, honoring strict platform handling.
    pub fn select(&self, inventory: &Inventory, selector: &Selector) -> netdispatch::Result<Selection> {
        let selection = select(inventory, selector, &self.registry);
        if self.config.defaults.strict_platforms {
            selection.ensure_supported()?;
        }
        let context = match selector.transport() {
            Some(transport) => format!("no device supports {}", transport),
            None => "no device matched".to_string(),
        };
        selection.ensure_not_empty(&context)?;
        Ok(selection)
    }

    /// Dispatcher using the configured forks and timeout.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.registry), self.config.dispatcher())
    }

    /// Load, select on the operation's transport, run and report.
    pub async fn dispatch(&self, operation: Operation) -> Result<i32> {
        let selector = self.selector().supported_for(operation.transport());
        self.dispatch_with(selector, operation).await
    }

    /// Like [`dispatch`](Self::dispatch) with a caller-built selector.
    pub async fn dispatch_with(&self, selector: Selector, operation: Operation) -> Result<i32> {
        let inventory = self.load_inventory()?;
        let selection = self.select(&inventory, &selector)?;

        let operation: Arc<dyn DeviceOperation> = Arc::new(operation);
        // No spinner while logs are on.
        let spinner = if self.verbosity == 0 {
            self.reporter.spinner(format!(
                "{} on {} device(s)",
                operation.name(),
                selection.len()
            ))
        } else {
            ProgressBar::hidden()
        };
        let results = self.dispatcher().run_selection(&selection, operation).await;
        spinner.finish_and_clear();

        Ok(self.finish(&results))
    }

    /// Print the results and compute the exit status.
    pub fn finish(&self, results: &ResultSet) -> i32 {
        print!("{}", self.reporter.render(results));
        if self.reporter.mode() == netdispatch::report::OutputMode::Json {
            println!();
        }
        exit_status(results)
    }
}

/// 0 when every dispatched device succeeded, 2 otherwise.
pub fn exit_status(results: &ResultSet) -> i32 {
    if results.all_succeeded() {
        EXIT_OK
    } else {
        EXIT_FAILED
    }
}

/// Exit status for an error escaping a command.
pub fn error_exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1)
}
