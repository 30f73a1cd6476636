//! Settable attributes of interfaces and peers.
//!
//! The command line names attributes as strings (`iface set wg0 port 51821`).
//! They are parsed here into typed values so an unknown attribute or a
//! malformed value is rejected before anything is touched.

use std::fmt;
use std::net::IpAddr;

use ipnet::{Ipv4Net, Ipv6Net};

use crate::error::{Error, Result};
use crate::validate;

/// A change to one interface attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceAttribute {
    /// Rename the interface.
    Name(String),
    /// Change the endpoint host peers connect to.
    Host(String),
    /// Change the listen port.
    Port(u16),
    /// Set or clear the NAT egress interface. Clearing also drops every NAT
    /// destination.
    NatIface(Option<String>),
    /// Replace the DNS servers pushed to peers.
    Dns(Vec<IpAddr>),
}

impl InterfaceAttribute {
    /// Attribute names accepted by [`InterfaceAttribute::parse`].
    pub const NAMES: &'static [&'static str] = &["name", "host", "port", "nat_iface", "dns"];

    /// Parses `attribute = value`.
    ///
    /// An empty `nat_iface` disables NAT; `dns` takes a comma separated
    /// list and an empty value clears it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unknown attributes and malformed
    /// values.
    pub fn parse(attribute: &str, value: &str) -> Result<Self> {
        match attribute {
            "name" => {
                validate::interface_name(value)?;
                Ok(Self::Name(value.to_string()))
            }
            "host" => {
                validate::host(value)?;
                Ok(Self::Host(value.to_string()))
            }
            "port" => Ok(Self::Port(validate::parse_port(value)?)),
            "nat_iface" => {
                let value = value.trim();
                Ok(Self::NatIface(
                    (!value.is_empty()).then(|| value.to_string()),
                ))
            }
            "dns" => Ok(Self::Dns(validate::parse_dns_list(value)?)),
            other => Err(unknown(other, Self::NAMES)),
        }
    }

    /// Attribute name as accepted by [`InterfaceAttribute::parse`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Host(_) => "host",
            Self::Port(_) => "port",
            Self::NatIface(_) => "nat_iface",
            Self::Dns(_) => "dns",
        }
    }
}

/// A change to one peer attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAttribute {
    /// Rename the peer.
    Name(String),
    /// Move the peer to another IPv4 address.
    Cidr4(Ipv4Net),
    /// Move the peer to another IPv6 address.
    Cidr6(Ipv6Net),
}

impl PeerAttribute {
    /// Attribute names accepted by [`PeerAttribute::parse`].
    pub const NAMES: &'static [&'static str] = &["name", "cidr4", "cidr6"];

    /// Parses `attribute = value`. Addresses may be bare or carry a host
    /// prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unknown attributes and malformed
    /// values.
    pub fn parse(attribute: &str, value: &str) -> Result<Self> {
        match attribute {
            "name" => {
                validate::peer_name(value)?;
                Ok(Self::Name(value.to_string()))
            }
            "cidr4" => Ok(Self::Cidr4(validate::parse_address4("cidr4", value)?)),
            "cidr6" => Ok(Self::Cidr6(validate::parse_address6("cidr6", value)?)),
            other => Err(unknown(other, Self::NAMES)),
        }
    }

    /// Attribute name as accepted by [`PeerAttribute::parse`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Cidr4(_) => "cidr4",
            Self::Cidr6(_) => "cidr6",
        }
    }
}

impl fmt::Display for InterfaceAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(value) | Self::Host(value) => write!(f, "{} = {value}", self.name()),
            Self::Port(port) => write!(f, "port = {port}"),
            Self::NatIface(Some(iface)) => write!(f, "nat_iface = {iface}"),
            Self::NatIface(None) => f.write_str("nat_iface = (disabled)"),
            Self::Dns(servers) => {
                let servers: Vec<String> = servers.iter().map(ToString::to_string).collect();
                write!(f, "dns = {}", servers.join(", "))
            }
        }
    }
}

impl fmt::Display for PeerAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name = {name}"),
            Self::Cidr4(net) => write!(f, "cidr4 = {net}"),
            Self::Cidr6(net) => write!(f, "cidr6 = {net}"),
        }
    }
}

fn unknown(attribute: &str, valid: &[&str]) -> Error {
    Error::validation(
        "attribute",
        format!(
            "unknown attribute \"{attribute}\" (expected one of: {})",
            valid.join(", ")
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn parses_interface_attributes() {
        assert_eq!(
            InterfaceAttribute::parse("port", "51821").expect("port"),
            InterfaceAttribute::Port(51821)
        );
        assert_eq!(
            InterfaceAttribute::parse("host", "vpn.example.com").expect("host"),
            InterfaceAttribute::Host("vpn.example.com".into())
        );
        assert_eq!(
            InterfaceAttribute::parse("nat_iface", "eth0").expect("nat"),
            InterfaceAttribute::NatIface(Some("eth0".into()))
        );
        assert_eq!(
            InterfaceAttribute::parse("nat_iface", "").expect("nat"),
            InterfaceAttribute::NatIface(None)
        );
    }

    #[test]
    fn dns_attribute_takes_a_list() {
        let attr = InterfaceAttribute::parse("dns", "1.1.1.1,9.9.9.9").expect("dns");
        assert_eq!(attr.to_string(), "dns = 1.1.1.1, 9.9.9.9");
    }

    #[test_case("name", "9bad" ; "bad name")]
    #[test_case("port", "0" ; "zero port")]
    #[test_case("port", "http" ; "non numeric port")]
    #[test_case("host", "" ; "empty host")]
    #[test_case("mtu", "1420" ; "unknown")]
    fn rejects_bad_interface_attributes(attribute: &str, value: &str) {
        let err = InterfaceAttribute::parse(attribute, value).expect_err("should reject");
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn unknown_attribute_lists_valid_names() {
        let err = PeerAttribute::parse("endpoint", "x").expect_err("unknown");
        assert!(err.to_string().contains("name, cidr4, cidr6"));
    }

    #[test]
    fn peer_addresses_accept_bare_ips() {
        assert_eq!(
            PeerAttribute::parse("cidr4", "10.8.0.9").expect("cidr4"),
            PeerAttribute::Cidr4("10.8.0.9/32".parse().expect("net"))
        );
        assert!(PeerAttribute::parse("cidr4", "10.8.0.0/24").is_err());
        assert!(PeerAttribute::parse("cidr6", "10.8.0.9").is_err());
    }

    #[test]
    fn names_round_trip_through_parse() {
        for name in InterfaceAttribute::NAMES {
            let value = match *name {
                "port" => "1",
                "dns" | "nat_iface" => "",
                "host" => "example.com",
                _ => "wg1",
            };
            let attr = InterfaceAttribute::parse(name, value).expect("parse");
            assert_eq!(attr.name(), *name);
        }
    }
}
