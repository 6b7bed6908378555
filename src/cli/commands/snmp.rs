//! SNMP commands
//!
//! Implements the `snmp-get` subcommand.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use netdispatch::operation::{AsyncSnmpClient, ObjectIdentifier, SnmpGet};
use netdispatch::Error;

/// Arguments for snmp-get command
#[derive(Parser, Debug, Clone)]
pub struct SnmpGetArgs {
    /// Identifiers: MODULE,object,instance, object.instance or a dotted OID
    #[arg(default_values = [
        "SNMPv2-MIB,sysDescr,0",
        "SNMPv2-MIB,sysName,0",
        "SNMPv2-MIB,sysUpTime,0",
    ])]
    pub identifiers: Vec<String>,

    /// Community (defaults to the configured one)
    #[arg(long)]
    pub community: Option<String>,
}

impl SnmpGetArgs {
    /// Parse identifiers up front so a typo fails before any device is
    /// contacted.
    pub fn validate(&self) -> netdispatch::Result<()> {
        for raw in &self.identifiers {
            let id: ObjectIdentifier = raw
                .parse()
                .map_err(|e| Error::InvalidRequest(format!("{}: {}", raw, e)))?;
            id.resolve()
                .map_err(|e| Error::InvalidRequest(format!("{}: {}", raw, e)))?;
        }
        Ok(())
    }

    /// Execute the snmp-get command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.validate()?;
        let mut settings = ctx.config.snmp.clone();
        if let Some(community) = &self.community {
            settings.community = community.clone();
        }
        let operation = SnmpGet::new(Arc::new(AsyncSnmpClient), settings, self.identifiers.iter());
        ctx.dispatch(operation.into()).await
    }
}
