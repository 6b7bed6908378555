//! Inventory commands
//!
//! Implements the `list-devices` subcommand.

use super::{CommandContext, EXIT_OK};
use anyhow::Result;
use clap::Parser;

use netdispatch::inventory::{select, Inventory};

/// Arguments for list-devices command
#[derive(Parser, Debug, Clone)]
pub struct ListDevicesArgs {}

impl ListDevicesArgs {
    /// Execute the list-devices command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let inventory = ctx.load_inventory()?;
        // Listing never fails on unknown platforms; those show as "-".
        let selection = select(&inventory, &ctx.selector(), &ctx.registry);
        let listed: Inventory = selection
            .devices
            .iter()
            .map(|device| (**device).clone())
            .collect();

        print!("{}", ctx.reporter.render_devices(&listed, &ctx.registry));
        Ok(EXIT_OK)
    }
}
