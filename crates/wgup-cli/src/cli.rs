//! CLI argument parsing using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::KeyBackend;

/// wgup - manage `WireGuard` interfaces, peers and NAT from one JSON document.
#[derive(Parser, Debug)]
#[command(name = "wgup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding interfaces.json
    #[arg(long, global = true, env = "WGUP_CONFIG_DIR", default_value = "/etc/wgup")]
    pub config_dir: PathBuf,

    /// Directory `iface sync` writes rendered configs into
    #[arg(
        long,
        global = true,
        env = "WGUP_WIREGUARD_DIR",
        default_value = "/etc/wireguard"
    )]
    pub wireguard_dir: PathBuf,

    /// Key generation backend
    #[arg(long, global = true, env = "WGUP_KEYGEN", value_enum, default_value_t = KeyBackend::Native)]
    pub keygen: KeyBackend,

    /// Path of the `wg` tool used by `--keygen wg`
    #[arg(long, global = true, env = "WGUP_WG_BINARY", default_value = "wg")]
    pub wg_binary: PathBuf,

    /// Path of the `systemctl` tool used by `iface up/down/reload`
    #[arg(long, global = true, env = "WGUP_SYSTEMCTL", default_value = "systemctl")]
    pub systemctl: PathBuf,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum Format {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage interfaces
    Iface {
        /// Interface subcommand
        #[command(subcommand)]
        command: IfaceCommands,
    },

    /// Manage peers of an interface
    Peer {
        /// Peer subcommand
        #[command(subcommand)]
        command: PeerCommands,
    },

    /// Manage NAT destinations of an interface
    Nat {
        /// NAT subcommand
        #[command(subcommand)]
        command: NatCommands,
    },

    /// Show program and config schema version
    Version,
}

/// Interface subcommands.
#[derive(Subcommand, Debug)]
pub enum IfaceCommands {
    /// List interfaces
    Ls,

    /// Create an interface
    Create(IfaceCreateArgs),

    /// Show interface details
    Show {
        /// Interface name
        interface: String,
    },

    /// Change one interface attribute (name, host, port, `nat_iface`, dns)
    Set {
        /// Interface name
        interface: String,
        /// Attribute name
        attribute: String,
        /// New value (empty `nat_iface` disables NAT, empty dns clears it)
        value: String,
    },

    /// Remove an interface and all its peers
    Rm {
        /// Interface name
        interface: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Print the rendered server config
    Export {
        /// Interface name
        interface: String,
        /// Write to this file instead of stdout
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },

    /// Enable and (re)start the wg-quick unit
    Up {
        /// Interface name
        interface: String,
    },

    /// Disable and stop the wg-quick unit
    Down {
        /// Interface name
        interface: String,
    },

    /// Reload the wg-quick unit
    Reload {
        /// Interface name
        interface: String,
    },

    /// Replace the interface key pair
    Rekey {
        /// Interface name
        interface: String,
    },

    /// Write the rendered server config into the `WireGuard` directory
    Sync {
        /// Interface name
        interface: String,
    },
}

/// Arguments for `iface create`.
#[derive(Args, Debug)]
pub struct IfaceCreateArgs {
    /// Interface name
    pub name: String,

    /// IPv4 pool (random /24 in 192.168.11.0-192.168.254.0 when omitted)
    #[arg(long)]
    pub cidr4: Option<String>,

    /// IPv6 pool (random /64 in fd00::/8 when omitted)
    #[arg(long)]
    pub cidr6: Option<String>,

    /// Egress interface for NAT; NAT stays disabled when omitted
    #[arg(long, alias = "nat_iface")]
    pub nat_iface: Option<String>,

    /// Endpoint host peers connect to
    #[arg(long)]
    pub host: String,

    /// Listen port
    #[arg(long)]
    pub port: u16,
}

/// Peer subcommands.
#[derive(Subcommand, Debug)]
pub enum PeerCommands {
    /// List peers of an interface
    Ls {
        /// Interface name
        interface: String,
    },

    /// Create a peer
    Create {
        /// Interface name
        interface: String,
        /// Peer name
        name: String,
        /// IPv4 address (allocated when omitted)
        #[arg(long)]
        cidr4: Option<String>,
        /// IPv6 address (allocated when omitted)
        #[arg(long)]
        cidr6: Option<String>,
    },

    /// Show peer details
    Show {
        /// Interface name
        interface: String,
        /// Peer name
        peer: String,
    },

    /// Print the rendered client config
    Export {
        /// Interface name
        interface: String,
        /// Peer name
        peer: String,
        /// Write to this file instead of stdout
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },

    /// Change one peer attribute (name, cidr4, cidr6)
    Set {
        /// Interface name
        interface: String,
        /// Peer name
        peer: String,
        /// Attribute name
        attribute: String,
        /// New value
        value: String,
    },

    /// Remove a peer
    Rm {
        /// Interface name
        interface: String,
        /// Peer name
        peer: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Replace the peer key pair and preshared key
    Rekey {
        /// Interface name
        interface: String,
        /// Peer name
        peer: String,
    },
}

/// NAT subcommands.
#[derive(Subcommand, Debug)]
pub enum NatCommands {
    /// Add NAT destinations
    Create {
        /// Interface name
        interface: String,
        /// Destinations
        #[command(flatten)]
        destination: NatDestinationArgs,
    },

    /// Remove NAT destinations
    Rm {
        /// Interface name
        interface: String,
        /// Destinations
        #[command(flatten)]
        destination: NatDestinationArgs,
    },
}

/// NAT destination networks; at least one is required.
#[derive(Args, Debug)]
#[group(required = true, multiple = true)]
pub struct NatDestinationArgs {
    /// IPv4 destination network
    #[arg(long)]
    pub cidr4: Option<String>,

    /// IPv6 destination network
    #[arg(long)]
    pub cidr6: Option<String>,
}
