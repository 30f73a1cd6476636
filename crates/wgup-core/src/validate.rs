//! Input validation for names, endpoints and address ranges.
//!
//! Every function returns [`Error::Validation`] naming the offending field.
//! CIDRs are strict: an address with host bits set is rejected rather than
//! silently truncated.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Regex for interface names. Linux caps interface names at 15 bytes.
static INTERFACE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{1,14}$").unwrap_or_else(|_| unreachable!())
});

/// Regex for peer names.
static PEER_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{1,20}$").unwrap_or_else(|_| unreachable!())
});

/// Regex for existing system interfaces used as NAT egress (`br-1a2b`,
/// `eth0.100`). The name is interpolated into `PostUp` commands, so shell
/// metacharacters are excluded.
static NAT_IFACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.\-]{0,14}$").unwrap_or_else(|_| unreachable!())
});

/// Regex for DNS hostnames (RFC 1123).
static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)*$")
        .unwrap_or_else(|_| unreachable!())
});

/// Maximum length for hostnames (RFC 1035).
const MAX_HOSTNAME_LENGTH: usize = 253;

/// Validates an interface name: a letter followed by 1-14 letters, digits
/// or underscores.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the name does not match.
pub fn interface_name(name: &str) -> Result<()> {
    if INTERFACE_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(Error::validation(
            "interface name",
            format!(
                "\"{name}\" must start with a letter and contain 2-15 letters, digits or underscores"
            ),
        ))
    }
}

/// Validates a peer name: a letter followed by 1-20 letters, digits or
/// underscores.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the name does not match.
pub fn peer_name(name: &str) -> Result<()> {
    if PEER_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(Error::validation(
            "peer name",
            format!(
                "\"{name}\" must start with a letter and contain 2-21 letters, digits or underscores"
            ),
        ))
    }
}

/// Validates the name of an existing system interface used for NAT egress.
///
/// # Errors
///
/// Returns [`Error::Validation`] when the name does not match.
pub fn nat_interface_name(name: &str) -> Result<()> {
    if NAT_IFACE_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(Error::validation(
            "nat_iface",
            format!("\"{name}\" is not a valid network interface name"),
        ))
    }
}

/// Validates stored key text. Keys are opaque here but end up alone on a
/// config line, so they must be non-empty and free of whitespace.
///
/// # Errors
///
/// Returns [`Error::Validation`] for empty keys or keys with whitespace or
/// control characters.
pub fn key_text(field: &'static str, key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::validation(field, "contains whitespace"));
    }
    Ok(())
}

/// Validates an endpoint host: an IP address or a DNS hostname.
///
/// # Errors
///
/// Returns [`Error::Validation`] for empty or malformed hosts.
pub fn host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Error::validation("host", "must not be empty"));
    }
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if host.len() > MAX_HOSTNAME_LENGTH || !HOSTNAME_REGEX.is_match(host) {
        return Err(Error::validation(
            "host",
            format!("\"{host}\" is neither an IP address nor a hostname"),
        ));
    }
    Ok(())
}

/// Validates a listen port. Zero is rejected.
///
/// # Errors
///
/// Returns [`Error::Validation`] for port 0.
pub fn port(port: u16) -> Result<u16> {
    if port == 0 {
        return Err(Error::validation("port", "must be between 1 and 65535"));
    }
    Ok(port)
}

/// Parses and validates a listen port from text.
///
/// # Errors
///
/// Returns [`Error::Validation`] for non-numeric or out-of-range input.
pub fn parse_port(value: &str) -> Result<u16> {
    let parsed = value
        .trim()
        .parse::<u16>()
        .map_err(|_| Error::validation("port", format!("\"{value}\" is not between 1 and 65535")))?;
    port(parsed)
}

/// Rejects an IPv4 network with host bits set.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `net` is not its own network address.
pub fn strict4(field: &'static str, net: Ipv4Net) -> Result<Ipv4Net> {
    if net.trunc() == net {
        Ok(net)
    } else {
        Err(Error::validation(
            field,
            format!("{net} has host bits set (did you mean {}?)", net.trunc()),
        ))
    }
}

/// Rejects an IPv6 network with host bits set.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `net` is not its own network address.
pub fn strict6(field: &'static str, net: Ipv6Net) -> Result<Ipv6Net> {
    if net.trunc() == net {
        Ok(net)
    } else {
        Err(Error::validation(
            field,
            format!("{net} has host bits set (did you mean {}?)", net.trunc()),
        ))
    }
}

/// Parses a strict IPv4 CIDR such as `10.8.0.0/24`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for unparsable input, IPv6 input, or host
/// bits set.
pub fn parse_cidr4(field: &'static str, value: &str) -> Result<Ipv4Net> {
    let net = value.trim().parse::<Ipv4Net>().map_err(|_| {
        Error::validation(field, format!("\"{value}\" is not an IPv4 CIDR"))
    })?;
    strict4(field, net)
}

/// Parses a strict IPv6 CIDR such as `fd00:8::/64`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for unparsable input, IPv4 input, or host
/// bits set.
pub fn parse_cidr6(field: &'static str, value: &str) -> Result<Ipv6Net> {
    let net = value.trim().parse::<Ipv6Net>().map_err(|_| {
        Error::validation(field, format!("\"{value}\" is not an IPv6 CIDR"))
    })?;
    strict6(field, net)
}

/// Parses a single IPv4 host address, given bare (`10.8.0.5`) or as a `/32`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for anything other than one IPv4 address.
pub fn parse_address4(field: &'static str, value: &str) -> Result<Ipv4Net> {
    let value = value.trim();
    if let Ok(addr) = value.parse::<Ipv4Addr>() {
        return Ok(Ipv4Net::from(addr));
    }
    match value.parse::<Ipv4Net>() {
        Ok(net) if net.prefix_len() == 32 => Ok(net),
        Ok(net) => Err(Error::validation(
            field,
            format!("{net} is a range; expected a single address or a /32"),
        )),
        Err(_) => Err(Error::validation(
            field,
            format!("\"{value}\" is not an IPv4 address"),
        )),
    }
}

/// Parses a single IPv6 host address, given bare (`fd00::5`) or as a `/128`.
///
/// # Errors
///
/// Returns [`Error::Validation`] for anything other than one IPv6 address.
pub fn parse_address6(field: &'static str, value: &str) -> Result<Ipv6Net> {
    let value = value.trim();
    if let Ok(addr) = value.parse::<Ipv6Addr>() {
        return Ok(Ipv6Net::from(addr));
    }
    match value.parse::<Ipv6Net>() {
        Ok(net) if net.prefix_len() == 128 => Ok(net),
        Ok(net) => Err(Error::validation(
            field,
            format!("{net} is a range; expected a single address or a /128"),
        )),
        Err(_) => Err(Error::validation(
            field,
            format!("\"{value}\" is not an IPv6 address"),
        )),
    }
}

/// Parses a comma separated list of DNS server addresses. Empty input
/// yields an empty list.
///
/// # Errors
///
/// Returns [`Error::Validation`] if any entry is not an IP address.
pub fn parse_dns_list(value: &str) -> Result<Vec<IpAddr>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<IpAddr>()
                .map_err(|_| Error::validation("dns", format!("\"{entry}\" is not an IP address")))
        })
        .collect()
}
