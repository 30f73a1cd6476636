//! Interface management commands.

use std::io::{BufRead, Write};

use tracing::debug;
use wgup_core::{InterfaceAttribute, NewInterface, render, validate};

use crate::cli::{IfaceCommands, IfaceCreateArgs};
use crate::context::Context;
use crate::error::CliError;
use crate::output::{InterfaceDetail, InterfaceList, InterfaceSummary, Message, OutputFormat};

use super::{confirm, write_config};

/// Interface command executor.
pub struct IfaceCommand<'a> {
    ctx: &'a mut Context,
}

impl<'a> IfaceCommand<'a> {
    /// Create a new interface command.
    #[must_use]
    pub fn new(ctx: &'a mut Context) -> Self {
        Self { ctx }
    }

    /// Execute an interface subcommand. `input` answers confirmation
    /// prompts.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails or is declined.
    pub fn execute<W: Write, R: BufRead>(
        &mut self,
        writer: &mut W,
        input: &mut R,
        format: &OutputFormat,
        command: &IfaceCommands,
    ) -> Result<(), CliError> {
        match command {
            IfaceCommands::Ls => {
                let list = InterfaceList {
                    interfaces: self
                        .ctx
                        .store()?
                        .interfaces()
                        .map(InterfaceSummary::from)
                        .collect(),
                };
                format.write(writer, &list)?;
            }
            IfaceCommands::Create(args) => {
                let msg = self.create(args)?;
                format.write(writer, &msg)?;
            }
            IfaceCommands::Show { interface } => {
                let detail = InterfaceDetail::from(self.ctx.store()?.interface(interface)?);
                format.write(writer, &detail)?;
            }
            IfaceCommands::Set {
                interface,
                attribute,
                value,
            } => {
                let attribute = InterfaceAttribute::parse(attribute, value)?;
                let change = attribute.to_string();
                self.ctx.store()?.update_interface(interface, attribute)?;
                let msg = Message::success(format!("Updated interface {interface}: {change}"));
                format.write(writer, &msg)?;
            }
            IfaceCommands::Rm { interface, force } => {
                self.ctx.store()?.interface(interface)?;
                if !force
                    && !confirm(
                        writer,
                        input,
                        &format!("Are you sure you want to remove interface {interface}?"),
                    )?
                {
                    return Err(CliError::Cancelled);
                }
                let removed = self.ctx.store()?.remove_interface(interface)?;
                let msg = Message::success(format!(
                    "Removed interface {interface} and {} peer(s)",
                    removed.peers().len()
                ));
                format.write(writer, &msg)?;
            }
            IfaceCommands::Export { interface, file } => {
                let config = render::interface_config(self.ctx.store()?.interface(interface)?);
                write_config(writer, format, file.as_deref(), &config)?;
            }
            IfaceCommands::Up { interface } => {
                self.ctx.store()?.interface(interface)?;
                self.ctx.service().up(interface)?;
                format.write(writer, &Message::success(format!("Interface {interface} is up")))?;
            }
            IfaceCommands::Down { interface } => {
                self.ctx.store()?.interface(interface)?;
                self.ctx.service().down(interface)?;
                format.write(writer, &Message::success(format!("Interface {interface} is down")))?;
            }
            IfaceCommands::Reload { interface } => {
                self.ctx.store()?.interface(interface)?;
                self.ctx.service().reload(interface)?;
                format.write(writer, &Message::success(format!("Reloaded interface {interface}")))?;
            }
            IfaceCommands::Rekey { interface } => {
                let (store, keys) = self.ctx.store_and_keys()?;
                store.rekey_interface(interface, keys)?;
                let msg = Message::success(format!(
                    "Rekeyed interface {interface}; re-export and redistribute every peer config"
                ));
                format.write(writer, &msg)?;
            }
            IfaceCommands::Sync { interface } => {
                let config = render::interface_config(self.ctx.store()?.interface(interface)?);
                let path = self.ctx.settings().sync_path(interface);
                wgup_core::store::write_atomic(&path, config.as_bytes())?;
                debug!(interface = %interface, path = %path.display(), "synced interface config");
                format.write(writer, &Message::success(format!("Wrote {}", path.display())))?;
            }
        }
        Ok(())
    }

    fn create(&mut self, args: &IfaceCreateArgs) -> Result<Message, CliError> {
        let cidr4 = match &args.cidr4 {
            Some(value) => validate::parse_cidr4("cidr4", value)?,
            None => wgup_ipam::auto_pool4(),
        };
        let cidr6 = match &args.cidr6 {
            Some(value) => validate::parse_cidr6("cidr6", value)?,
            None => wgup_ipam::auto_pool6(),
        };
        let new = NewInterface {
            name: args.name.clone(),
            cidr4,
            cidr6,
            host: args.host.clone(),
            port: args.port,
            nat_iface: args.nat_iface.clone().filter(|nat| !nat.is_empty()),
        };

        let (store, keys) = self.ctx.store_and_keys()?;
        let iface = store.create_interface(keys, new)?;
        Ok(Message::success(format!(
            "Created interface {} ({}, {})",
            iface.name(),
            iface.vpn_cidr4(),
            iface.vpn_cidr6()
        )))
    }
}
