//! NAT destination commands.

use std::io::Write;

use wgup_core::validate;

use crate::cli::{NatCommands, NatDestinationArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// NAT command executor.
pub struct NatCommand<'a> {
    ctx: &'a mut Context,
}

impl<'a> NatCommand<'a> {
    /// Create a new NAT command.
    #[must_use]
    pub fn new(ctx: &'a mut Context) -> Self {
        Self { ctx }
    }

    /// Execute a NAT subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if a destination is malformed or the store rejects
    /// the change.
    pub fn execute<W: Write>(
        &mut self,
        writer: &mut W,
        format: &OutputFormat,
        command: &NatCommands,
    ) -> Result<(), CliError> {
        match command {
            NatCommands::Create {
                interface,
                destination,
            } => {
                let (cidr4, cidr6) = parse(destination)?;
                self.ctx.store()?.add_nat(interface, cidr4, cidr6)?;
                let msg = Message::success(format!(
                    "Added NAT destination(s) {} to {interface}",
                    describe(destination)
                ));
                format.write(writer, &msg)?;
            }
            NatCommands::Rm {
                interface,
                destination,
            } => {
                let (cidr4, cidr6) = parse(destination)?;
                self.ctx.store()?.remove_nat(interface, cidr4, cidr6)?;
                let msg = Message::success(format!(
                    "Removed NAT destination(s) {} from {interface}",
                    describe(destination)
                ));
                format.write(writer, &msg)?;
            }
        }
        Ok(())
    }
}

type Destinations = (Option<ipnet::Ipv4Net>, Option<ipnet::Ipv6Net>);

fn parse(destination: &NatDestinationArgs) -> Result<Destinations, CliError> {
    let cidr4 = destination
        .cidr4
        .as_deref()
        .map(|value| validate::parse_cidr4("cidr4", value))
        .transpose()?;
    let cidr6 = destination
        .cidr6
        .as_deref()
        .map(|value| validate::parse_cidr6("cidr6", value))
        .transpose()?;
    Ok((cidr4, cidr6))
}

fn describe(destination: &NatDestinationArgs) -> String {
    [destination.cidr4.as_deref(), destination.cidr6.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
}
