//! Peer management commands.

use std::io::{BufRead, Write};

use wgup_core::{PeerAttribute, render, validate};

use crate::cli::PeerCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{Message, OutputFormat, PeerDetail, PeerList};

use super::{confirm, write_config};

/// Peer command executor.
pub struct PeerCommand<'a> {
    ctx: &'a mut Context,
}

impl<'a> PeerCommand<'a> {
    /// Create a new peer command.
    #[must_use]
    pub fn new(ctx: &'a mut Context) -> Self {
        Self { ctx }
    }

    /// Execute a peer subcommand. `input` answers confirmation prompts.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails or is declined.
    pub fn execute<W: Write, R: BufRead>(
        &mut self,
        writer: &mut W,
        input: &mut R,
        format: &OutputFormat,
        command: &PeerCommands,
    ) -> Result<(), CliError> {
        match command {
            PeerCommands::Ls { interface } => {
                let list = PeerList::from(self.ctx.store()?.interface(interface)?);
                format.write(writer, &list)?;
            }
            PeerCommands::Create {
                interface,
                name,
                cidr4,
                cidr6,
            } => {
                let cidr4 = cidr4
                    .as_deref()
                    .map(|value| validate::parse_address4("cidr4", value))
                    .transpose()?;
                let cidr6 = cidr6
                    .as_deref()
                    .map(|value| validate::parse_address6("cidr6", value))
                    .transpose()?;

                let (store, keys) = self.ctx.store_and_keys()?;
                let peer = store.create_peer(interface, keys, name, cidr4, cidr6)?;
                let msg = Message::success(format!(
                    "Created peer {name} on {interface} ({}, {})",
                    peer.cidr4(),
                    peer.cidr6()
                ));
                format.write(writer, &msg)?;
            }
            PeerCommands::Show { interface, peer } => {
                let iface = self.ctx.store()?.interface(interface)?;
                let detail = PeerDetail::new(iface, iface.peer(peer)?);
                format.write(writer, &detail)?;
            }
            PeerCommands::Export {
                interface,
                peer,
                file,
            } => {
                let iface = self.ctx.store()?.interface(interface)?;
                let config = render::peer_config(iface, iface.peer(peer)?);
                write_config(writer, format, file.as_deref(), &config)?;
            }
            PeerCommands::Set {
                interface,
                peer,
                attribute,
                value,
            } => {
                let attribute = PeerAttribute::parse(attribute, value)?;
                let change = attribute.to_string();
                self.ctx.store()?.update_peer(interface, peer, attribute)?;
                let msg = Message::success(format!("Updated peer {peer} on {interface}: {change}"));
                format.write(writer, &msg)?;
            }
            PeerCommands::Rm {
                interface,
                peer,
                force,
            } => {
                self.ctx.store()?.interface(interface)?.peer(peer)?;
                if !force
                    && !confirm(
                        writer,
                        input,
                        &format!("Are you sure you want to remove peer {peer} from {interface}?"),
                    )?
                {
                    return Err(CliError::Cancelled);
                }
                self.ctx.store()?.remove_peer(interface, peer)?;
                let msg = Message::success(format!("Removed peer {peer} from {interface}"));
                format.write(writer, &msg)?;
            }
            PeerCommands::Rekey { interface, peer } => {
                let (store, keys) = self.ctx.store_and_keys()?;
                store.rekey_peer(interface, peer, keys)?;
                let msg = Message::success(format!(
                    "Rekeyed peer {peer} on {interface}; re-export its config and sync {interface}"
                ));
                format.write(writer, &msg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use wgup_core::NewInterface;
    use wgup_keys::NativeKeys;

    fn setup(dir: &std::path::Path) -> Context {
        let (mut ctx, _) = context(dir);
        ctx.store()
            .expect("store")
            .create_interface(
                &NativeKeys,
                NewInterface {
                    name: "wg0".into(),
                    cidr4: "10.8.0.0/24".parse().expect("v4"),
                    cidr6: "fd00:8::/64".parse().expect("v6"),
                    host: "vpn.example.com".into(),
                    port: 51820,
                    nat_iface: None,
                },
            )
            .expect("wg0");
        ctx
    }

    fn run(ctx: &mut Context, command: &PeerCommands, input: &str) -> Result<String, CliError> {
        let mut out = Vec::new();
        PeerCommand::new(ctx).execute(
            &mut out,
            &mut input.as_bytes(),
            &OutputFormat::default(),
            command,
        )?;
        Ok(String::from_utf8(out).expect("utf-8"))
    }

    fn create(name: &str) -> PeerCommands {
        PeerCommands::Create {
            interface: "wg0".into(),
            name: name.into(),
            cidr4: None,
            cidr6: None,
        }
    }

    #[test]
    fn create_allocates_lowest_addresses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());

        let out = run(&mut ctx, &create("alice"), "").expect("alice");
        assert_eq!(
            out,
            "✓ Created peer alice on wg0 (10.8.0.2/32, fd00:8::2/128)\n"
        );
        let out = run(&mut ctx, &create("bob"), "").expect("bob");
        assert!(out.contains("10.8.0.3/32"));
    }

    #[test]
    fn create_with_explicit_address() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());
        let command = PeerCommands::Create {
            interface: "wg0".into(),
            name: "alice".into(),
            cidr4: Some("10.8.0.50".into()),
            cidr6: None,
        };
        run(&mut ctx, &command, "").expect("alice");

        let err = run(
            &mut ctx,
            &PeerCommands::Create {
                interface: "wg0".into(),
                name: "bob".into(),
                cidr4: Some("10.8.0.50/32".into()),
                cidr6: None,
            },
            "",
        )
        .expect_err("address taken");
        assert!(matches!(
            err,
            CliError::Core(wgup_core::Error::AddressInUse { .. })
        ));
    }

    #[test]
    fn duplicate_peer_is_a_conflict() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());
        run(&mut ctx, &create("alice"), "").expect("alice");
        let err = run(&mut ctx, &create("alice"), "").expect_err("duplicate");
        assert!(matches!(
            err,
            CliError::Core(wgup_core::Error::PeerExists { .. })
        ));
    }

    #[test]
    fn list_and_show() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());
        run(&mut ctx, &create("alice"), "").expect("alice");

        let out = run(
            &mut ctx,
            &PeerCommands::Ls {
                interface: "wg0".into(),
            },
            "",
        )
        .expect("ls");
        assert!(out.contains("alice"));
        assert!(out.contains("Total: 1 peer(s)"));

        let out = run(
            &mut ctx,
            &PeerCommands::Show {
                interface: "wg0".into(),
                peer: "alice".into(),
            },
            "",
        )
        .expect("show");
        assert!(out.contains("Peer: alice (wg0)"));
        let private_key = ctx
            .store()
            .expect("store")
            .interface("wg0")
            .expect("wg0")
            .peer("alice")
            .expect("alice")
            .private_key()
            .to_string();
        assert!(!out.contains(&private_key));
    }

    #[test]
    fn export_renders_client_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());
        run(&mut ctx, &create("alice"), "").expect("alice");
        let out = run(
            &mut ctx,
            &PeerCommands::Export {
                interface: "wg0".into(),
                peer: "alice".into(),
                file: None,
            },
            "",
        )
        .expect("export");
        assert!(out.contains("Address = 10.8.0.2/32"));
        assert!(out.contains("Endpoint = vpn.example.com:51820"));
    }

    #[test]
    fn set_renames_peer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());
        run(&mut ctx, &create("alice"), "").expect("alice");
        run(
            &mut ctx,
            &PeerCommands::Set {
                interface: "wg0".into(),
                peer: "alice".into(),
                attribute: "name".into(),
                value: "carol".into(),
            },
            "",
        )
        .expect("rename");

        let iface = ctx.store().expect("store").interface("wg0").expect("wg0");
        assert!(iface.peer("alice").is_err());
        assert_eq!(iface.peer("carol").expect("carol").cidr4().to_string(), "10.8.0.2/32");
    }

    #[test]
    fn rm_asks_for_confirmation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());
        run(&mut ctx, &create("alice"), "").expect("alice");
        let rm = PeerCommands::Rm {
            interface: "wg0".into(),
            peer: "alice".into(),
            force: false,
        };

        let err = run(&mut ctx, &rm, "\n").expect_err("declined");
        assert!(matches!(err, CliError::Cancelled));
        let out = run(&mut ctx, &rm, "y\n").expect("confirmed");
        assert!(out.contains("Are you sure you want to remove peer alice from wg0?"));
        assert!(out.contains("Removed peer alice from wg0"));
    }

    #[test]
    fn rm_missing_peer_fails_before_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());
        let mut out = Vec::new();
        let err = PeerCommand::new(&mut ctx)
            .execute(
                &mut out,
                &mut "y\n".as_bytes(),
                &OutputFormat::default(),
                &PeerCommands::Rm {
                    interface: "wg0".into(),
                    peer: "ghost".into(),
                    force: false,
                },
            )
            .expect_err("missing peer");
        assert!(matches!(
            err,
            CliError::Core(wgup_core::Error::PeerNotFound { .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn rekey_replaces_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut ctx = setup(dir.path());
        run(&mut ctx, &create("alice"), "").expect("alice");
        let public_key = |ctx: &mut Context| {
            ctx.store()
                .expect("store")
                .interface("wg0")
                .expect("wg0")
                .peer("alice")
                .expect("alice")
                .public_key()
                .to_string()
        };
        let before = public_key(&mut ctx);
        run(
            &mut ctx,
            &PeerCommands::Rekey {
                interface: "wg0".into(),
                peer: "alice".into(),
            },
            "",
        )
        .expect("rekey");
        assert_ne!(public_key(&mut ctx), before);
    }
}
