//! CLI module for netdispatch
//!
//! Argument parsing and subcommand wiring.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use netdispatch::report::OutputMode;

/// netdispatch - run one operation across many network devices
///
/// Operations reach devices over RESTCONF, CLI over SSH or SNMP. Every
/// selected device gets exactly one outcome.
#[derive(Parser, Debug, Clone)]
#[command(name = "netdispatch")]
#[command(author = "Netdispatch Contributors")]
#[command(version)]
#[command(about = "Multi-protocol network device task dispatcher", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the inventory (hosts) file
    #[arg(short = 'i', long, global = true)]
    pub inventory: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Limit execution to these devices (comma separated)
    #[arg(short = 'l', long, global = true, value_delimiter = ',')]
    pub limit: Vec<String>,

    /// Only devices in this group
    #[arg(long, global = true)]
    pub group: Option<String>,

    /// Maximum concurrent device sessions
    #[arg(short = 'f', long, global = true)]
    pub forks: Option<usize>,

    /// Per-device timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip TLS certificate validation for RESTCONF
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Fail the run when a device has an unsupported platform
    #[arg(long, global = true)]
    pub strict_platforms: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create or replace an interface over RESTCONF
    #[command(name = "interface-set")]
    InterfaceSet(commands::restconf::InterfaceSetArgs),

    /// Read interface configuration over RESTCONF
    Interfaces(commands::restconf::InterfacesArgs),

    /// Push configuration lines over SSH
    #[command(name = "push-config")]
    PushConfig(commands::cli::PushConfigArgs),

    /// Enable read-only SNMP on IOS devices
    #[command(name = "enable-snmp")]
    EnableSnmp(commands::cli::EnableSnmpArgs),

    /// Run one show command over SSH
    Command(commands::cli::CommandArgs),

    /// Save each device's running configuration
    #[command(name = "fetch-config")]
    FetchConfig(commands::cli::FetchConfigArgs),

    /// SNMP GET one or more identifiers
    #[command(name = "snmp-get")]
    SnmpGet(commands::snmp::SnmpGetArgs),

    /// Report ICMP reachability
    Ping(commands::reachability::PingArgs),

    /// Ping, then show interfaces on reachable devices
    #[command(name = "check-connectivity")]
    CheckConnectivity(commands::reachability::CheckConnectivityArgs),

    /// List inventory devices and their platforms
    #[command(name = "list-devices")]
    ListDevices(commands::inventory::ListDevicesArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["netdispatch", "list-devices"]).unwrap();
        assert!(matches!(cli.command, Commands::ListDevices(_)));
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["netdispatch", "-vvvv", "ping"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_limit_list() {
        let cli = Cli::try_parse_from(["netdispatch", "--limit", "R1,R2", "ping"]).unwrap();
        assert_eq!(cli.limit, vec!["R1", "R2"]);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "netdispatch",
            "command",
            "show version",
            "--forks",
            "3",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.forks, Some(3));
        assert!(cli.is_json());
        match cli.command {
            Commands::Command(args) => assert_eq!(args.command, "show version"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_interface_set_requires_address() {
        assert!(
            Cli::try_parse_from(["netdispatch", "interface-set", "--interface", "Loopback0"])
                .is_err()
        );
    }
}
