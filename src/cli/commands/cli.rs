//! SSH commands - config push, SNMP enablement, show commands, config fetch
//!
//! Implements the `push-config`, `enable-snmp`, `command` and
//! `fetch-config` subcommands.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use netdispatch::operation::cli::SNMP_ENABLE_PLATFORMS;
use netdispatch::operation::{
    snmp_enable_commands, CliCommand, CliConfigPush, CliConnector, ConfigSource, FetchConfig,
    RusshCliConnector,
};
use netdispatch::platform::TransportKind;
use netdispatch::Error;

fn connector(ctx: &CommandContext) -> Arc<dyn CliConnector> {
    Arc::new(RusshCliConnector::new(ctx.config.ssh.settings()))
}

/// Arguments for push-config command
#[derive(Parser, Debug, Clone)]
pub struct PushConfigArgs {
    /// Directory of per-device config files ({device}.ios / {device}.cfg)
    #[arg(long, conflicts_with_all = ["lines", "file"])]
    pub config_dir: Option<PathBuf>,

    /// One file pushed to every device
    #[arg(long, conflicts_with = "lines")]
    pub file: Option<PathBuf>,

    /// Explicit configuration line (repeatable)
    #[arg(long = "lines", short = 'L', action = clap::ArgAction::Append)]
    pub lines: Vec<String>,
}

impl PushConfigArgs {
    /// Where the configuration comes from.
    pub fn source(&self, default_dir: &std::path::Path) -> ConfigSource {
        if !self.lines.is_empty() {
            ConfigSource::Lines(self.lines.clone())
        } else if let Some(file) = &self.file {
            ConfigSource::File(file.clone())
        } else {
            ConfigSource::Directory(
                self.config_dir
                    .clone()
                    .unwrap_or_else(|| default_dir.to_path_buf()),
            )
        }
    }

    /// Execute the push-config command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let source = self.source(&ctx.config.ssh.config_dir);
        ctx.dispatch(CliConfigPush::new(connector(ctx), source).into())
            .await
    }
}

/// Arguments for enable-snmp command
#[derive(Parser, Debug, Clone)]
pub struct EnableSnmpArgs {
    /// Management host allowed to poll
    #[arg(long)]
    pub acl_host: String,

    /// Read-only community (defaults to the configured one)
    #[arg(long)]
    pub community: Option<String>,

    /// snmp-server location
    #[arg(long, default_value = "Lab")]
    pub location: String,

    /// snmp-server contact
    #[arg(long, default_value = "admin@example.com")]
    pub contact: String,
}

impl EnableSnmpArgs {
    /// Configuration lines for this request.
    pub fn commands(&self, default_community: &str) -> netdispatch::Result<Vec<String>> {
        if self.acl_host.trim().is_empty() {
            return Err(Error::InvalidRequest("--acl-host is empty".into()));
        }
        let community = self.community.as_deref().unwrap_or(default_community);
        Ok(snmp_enable_commands(
            self.acl_host.trim(),
            community,
            &self.location,
            &self.contact,
        ))
    }

    /// Execute the enable-snmp command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let lines = self.commands(&ctx.config.snmp.community)?;
        let selector = ctx
            .selector()
            .supported_for(TransportKind::Cli)
            .canonical_in(SNMP_ENABLE_PLATFORMS.iter().copied());
        let operation = CliConfigPush::new(connector(ctx), ConfigSource::Lines(lines));
        ctx.dispatch_with(selector, operation.into()).await
    }
}

/// Arguments for command command
#[derive(Parser, Debug, Clone)]
pub struct CommandArgs {
    /// Command to run (e.g. "show ip interface brief")
    pub command: String,
}

impl CommandArgs {
    /// Execute the command command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        if self.command.trim().is_empty() {
            return Err(Error::InvalidRequest("command is empty".into()).into());
        }
        ctx.dispatch(CliCommand::new(connector(ctx), self.command.trim()).into())
            .await
    }
}

/// Arguments for fetch-config command
#[derive(Parser, Debug, Clone)]
pub struct FetchConfigArgs {
    /// Directory running configs are saved to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl FetchConfigArgs {
    /// Execute the fetch-config command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| ctx.config.ssh.output_dir.clone());
        let operation = FetchConfig::new(connector(ctx)).with_output_dir(dir);
        ctx.dispatch(operation.into()).await
    }
}
