//! # wgup-cli
//!
//! Command-line front end for wgup.
//!
//! Every subcommand maps to one operation on the [`wgup_core::ConfigStore`]
//! plus presentation. The store, key provider and service manager live in a
//! [`Context`] built once in `main` and handed to each command handler.
//!
//! ```text
//! ┌──────┐  Settings  ┌─────────┐  ConfigStore   ┌───────────────────┐
//! │ clap │──────────► │ Context │──────────────► │ interfaces.json   │
//! └──────┘            │         │  KeyProvider   ├───────────────────┤
//!                     │         │──────────────► │ native / wg tool  │
//!                     │         │  Systemd       ├───────────────────┤
//!                     │         │──────────────► │ wg-quick@<iface>  │
//!                     └─────────┘                └───────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;
pub mod service;

pub use cli::{Cli, Commands, Format, IfaceCommands, NatCommands, PeerCommands};
pub use config::{KeyBackend, Settings};
pub use context::Context;
pub use error::CliError;
pub use output::OutputFormat;
pub use service::{ServiceManager, Systemd};
