//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats. Rendered
//! `WireGuard` configs bypass this and are written verbatim.

use std::io::Write;

use serde::Serialize;
use wgup_core::{Interface, Peer};

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// One row of `iface ls`.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceSummary {
    /// Interface name.
    pub name: String,
    /// Endpoint host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Number of peers.
    pub peers: usize,
}

impl From<&Interface> for InterfaceSummary {
    fn from(iface: &Interface) -> Self {
        Self {
            name: iface.name().to_string(),
            host: iface.host().to_string(),
            port: iface.port(),
            peers: iface.peers().len(),
        }
    }
}

/// Interfaces for display.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceList {
    /// Interfaces, sorted by name.
    pub interfaces: Vec<InterfaceSummary>,
}

impl TableDisplay for InterfaceList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.interfaces.is_empty() {
            writeln!(writer, "No interfaces configured")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<15}  {:<32}  {:>5}  {:>5}",
            "NAME", "HOST", "PORT", "PEERS"
        )?;
        writeln!(writer, "{}", "─".repeat(63))?;
        for iface in &self.interfaces {
            writeln!(
                writer,
                "{:<15}  {:<32}  {:>5}  {:>5}",
                iface.name,
                truncate(&iface.host, 32),
                iface.port,
                iface.peers
            )?;
        }
        Ok(())
    }
}

/// Details of one interface for `iface show`.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceDetail {
    /// Interface name.
    pub name: String,
    /// Server public key.
    pub public_key: String,
    /// Endpoint host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// IPv4 pool.
    pub vpn_cidr4: String,
    /// IPv6 pool.
    pub vpn_cidr6: String,
    /// Server IPv4 address.
    pub addr4: String,
    /// Server IPv6 address.
    pub addr6: String,
    /// Addresses left in the IPv4 pool.
    pub free4: u128,
    /// Addresses left in the IPv6 pool.
    pub free6: u128,
    /// NAT egress interface, when NAT is enabled.
    pub nat_iface: Option<String>,
    /// IPv4 NAT destinations.
    pub nat_cidr4: Vec<String>,
    /// IPv6 NAT destinations.
    pub nat_cidr6: Vec<String>,
    /// DNS servers pushed to peers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    /// Peers of the interface.
    pub peers: Vec<PeerSummary>,
}

impl From<&Interface> for InterfaceDetail {
    fn from(iface: &Interface) -> Self {
        let (free4, free6) = iface.free_addresses();
        Self {
            name: iface.name().to_string(),
            public_key: iface.public_key().to_string(),
            host: iface.host().to_string(),
            port: iface.port(),
            vpn_cidr4: iface.vpn_cidr4().to_string(),
            vpn_cidr6: iface.vpn_cidr6().to_string(),
            addr4: iface.addr4().to_string(),
            addr6: iface.addr6().to_string(),
            free4,
            free6,
            nat_iface: iface.nat_iface().map(str::to_string),
            nat_cidr4: iface.nat_cidr4().iter().map(ToString::to_string).collect(),
            nat_cidr6: iface.nat_cidr6().iter().map(ToString::to_string).collect(),
            dns: iface.dns().iter().map(ToString::to_string).collect(),
            peers: iface.peers().map(PeerSummary::from).collect(),
        }
    }
}

impl TableDisplay for InterfaceDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Interface: {}", self.name)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Public Key:       {}", self.public_key)?;
        writeln!(writer, "Endpoint:         {}:{}", self.host, self.port)?;
        writeln!(writer)?;
        writeln!(writer, "Addressing")?;
        writeln!(
            writer,
            "  VPN IPv4 Pool:  {} (server {}, {} free)",
            self.vpn_cidr4, self.addr4, self.free4
        )?;
        writeln!(
            writer,
            "  VPN IPv6 Pool:  {} (server {}, {} free)",
            self.vpn_cidr6, self.addr6, self.free6
        )?;
        if !self.dns.is_empty() {
            writeln!(writer, "  DNS:            {}", self.dns.join(", "))?;
        }
        writeln!(writer)?;
        match &self.nat_iface {
            Some(nat_iface) => {
                writeln!(writer, "NAT Enabled")?;
                writeln!(writer, "  Interface:      {nat_iface}")?;
                writeln!(writer, "  IPv4 Dests:     {}", list_or_none(&self.nat_cidr4))?;
                writeln!(writer, "  IPv6 Dests:     {}", list_or_none(&self.nat_cidr6))?;
            }
            None => writeln!(writer, "NAT Disabled")?,
        }

        if !self.peers.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Peers ({})", self.peers.len())?;
            for peer in &self.peers {
                writeln!(
                    writer,
                    "  {:<20}  {:<18}  {}",
                    peer.name, peer.cidr4, peer.cidr6
                )?;
            }
        }
        Ok(())
    }
}

/// One row of `peer ls`.
#[derive(Debug, Clone, Serialize)]
pub struct PeerSummary {
    /// Peer name.
    pub name: String,
    /// IPv4 address.
    pub cidr4: String,
    /// IPv6 address.
    pub cidr6: String,
}

impl From<&Peer> for PeerSummary {
    fn from(peer: &Peer) -> Self {
        Self {
            name: peer.name().to_string(),
            cidr4: peer.cidr4().to_string(),
            cidr6: peer.cidr6().to_string(),
        }
    }
}

/// Peers of one interface for display.
#[derive(Debug, Clone, Serialize)]
pub struct PeerList {
    /// Interface name.
    pub interface: String,
    /// Peers, sorted by name.
    pub peers: Vec<PeerSummary>,
}

impl From<&Interface> for PeerList {
    fn from(iface: &Interface) -> Self {
        Self {
            interface: iface.name().to_string(),
            peers: iface.peers().map(PeerSummary::from).collect(),
        }
    }
}

impl TableDisplay for PeerList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.peers.is_empty() {
            writeln!(writer, "No peers on {}", self.interface)?;
            return Ok(());
        }

        writeln!(writer, "{:<20}  {:<18}  {}", "NAME", "IPV4", "IPV6")?;
        writeln!(writer, "{}", "─".repeat(80))?;
        for peer in &self.peers {
            writeln!(
                writer,
                "{:<20}  {:<18}  {}",
                peer.name, peer.cidr4, peer.cidr6
            )?;
        }
        writeln!(writer)?;
        writeln!(writer, "Total: {} peer(s)", self.peers.len())?;
        Ok(())
    }
}

/// Details of one peer for `peer show`. Key material other than the
/// public key stays out of the output.
#[derive(Debug, Clone, Serialize)]
pub struct PeerDetail {
    /// Interface name.
    pub interface: String,
    /// Peer name.
    pub name: String,
    /// Peer public key.
    pub public_key: String,
    /// IPv4 address.
    pub cidr4: String,
    /// IPv6 address.
    pub cidr6: String,
}

impl PeerDetail {
    /// Builds the view of `peer` on `iface`.
    #[must_use]
    pub fn new(iface: &Interface, peer: &Peer) -> Self {
        Self {
            interface: iface.name().to_string(),
            name: peer.name().to_string(),
            public_key: peer.public_key().to_string(),
            cidr4: peer.cidr4().to_string(),
            cidr6: peer.cidr6().to_string(),
        }
    }
}

impl TableDisplay for PeerDetail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Peer: {} ({})", self.name, self.interface)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Public Key:       {}", self.public_key)?;
        writeln!(writer, "IPv4 Address:     {}", self.cidr4)?;
        writeln!(writer, "IPv6 Address:     {}", self.cidr6)?;
        Ok(())
    }
}

/// Program and schema version.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Program name.
    pub program: &'static str,
    /// Program version.
    pub version: &'static str,
    /// Config schema version this build reads and writes.
    pub config_version: u32,
}

impl TableDisplay for VersionInfo {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(
            writer,
            "{} v{} (config version {})",
            self.program, self.version, self.config_version
        )?;
        Ok(())
    }
}

/// Confirmation that a command changed something.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ {}", self.message)?;
        Ok(())
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

/// Truncate a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
