//! RESTCONF commands - interface create/replace and read
//!
//! Implements the `interface-set` and `interfaces` subcommands.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use std::net::Ipv4Addr;
use std::sync::Arc;

use netdispatch::operation::{InterfaceConfig, Operation, RestconfClient, RestconfGet, RestconfPut};
use netdispatch::Error;

/// Arguments for interface-set command
#[derive(Parser, Debug, Clone)]
pub struct InterfaceSetArgs {
    /// Interface name (e.g. Loopback0)
    #[arg(long)]
    pub interface: String,

    /// IPv4 address
    #[arg(long)]
    pub ip: String,

    /// IPv4 netmask in dotted form
    #[arg(long)]
    pub netmask: String,

    /// Interface description
    #[arg(long)]
    pub description: Option<String>,

    /// Create the interface administratively down
    #[arg(long)]
    pub disabled: bool,

    /// IANA interface type
    #[arg(long = "type")]
    pub if_type: Option<String>,
}

impl InterfaceSetArgs {
    /// Build the interface document, validating the addressing.
    pub fn interface(&self) -> netdispatch::Result<InterfaceConfig> {
        if self.interface.trim().is_empty() {
            return Err(Error::InvalidRequest("interface name is empty".into()));
        }
        self.ip
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::InvalidRequest(format!("invalid IPv4 address '{}'", self.ip)))?;
        self.netmask
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::InvalidRequest(format!("invalid netmask '{}'", self.netmask)))?;

        let mut interface = InterfaceConfig::new(self.interface.trim())
            .with_ipv4(&self.ip, &self.netmask)
            .enabled(!self.disabled);
        if let Some(description) = &self.description {
            interface = interface.with_description(description);
        }
        if let Some(if_type) = &self.if_type {
            interface = interface.with_type(if_type);
        }
        Ok(interface)
    }

    /// Execute the interface-set command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let interface = self.interface()?;
        let client = Arc::new(RestconfClient::new(ctx.config.restconf.clone())?);
        ctx.dispatch(RestconfPut::new(client, interface).into()).await
    }
}

/// Arguments for interfaces command
#[derive(Parser, Debug, Clone)]
pub struct InterfacesArgs {
    /// Read a single interface instead of the whole list
    #[arg(long)]
    pub interface: Option<String>,
}

impl InterfacesArgs {
    /// Execute the interfaces command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let client = Arc::new(RestconfClient::new(ctx.config.restconf.clone())?);
        let operation: Operation = match &self.interface {
            Some(name) => RestconfGet::interface(client, name).into(),
            None => RestconfGet::all(client).into(),
        };
        ctx.dispatch(operation).await
    }
}
