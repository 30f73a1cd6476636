//! A WireGuard network and its peers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use wgup_keys::KeyProvider;

use crate::attribute::{InterfaceAttribute, PeerAttribute};
use crate::error::{Error, Result};
use crate::named::Named;
use crate::peer::Peer;
use crate::validate;

/// One WireGuard interface: the server side of a VPN.
///
/// The interface owns an IPv4 and an IPv6 pool. The server holds the second
/// address of each (`addr4`/`addr6`, with the pool's prefix) and every peer
/// holds one host address from each. Peer names and peer addresses are
/// unique within the interface.
///
/// NAT is enabled when `nat_iface` is set; the NAT destination lists are
/// only meaningful then and are cleared when NAT is disabled.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    private_key: String,
    public_key: String,
    vpn_iface: String,
    vpn_cidr4: Ipv4Net,
    vpn_cidr6: Ipv6Net,
    addr4: Ipv4Net,
    addr6: Ipv6Net,
    host: String,
    port: u16,
    #[serde(default, with = "nat_iface_field")]
    nat_iface: Option<String>,
    #[serde(default)]
    nat_cidr4: BTreeSet<Ipv4Net>,
    #[serde(default)]
    nat_cidr6: BTreeSet<Ipv6Net>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dns: Vec<IpAddr>,
    #[serde(with = "crate::named")]
    peers: BTreeMap<String, Peer>,
}

impl Interface {
    /// Creates an interface with fresh server keys and no peers.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad name, host, port, a pool with
    /// host bits set, or a pool too small to hold the server address. Keys
    /// are only generated once the input is valid.
    pub fn create(
        keys: &dyn KeyProvider,
        name: &str,
        cidr4: Ipv4Net,
        cidr6: Ipv6Net,
        host: &str,
        port: u16,
    ) -> Result<Self> {
        validate::interface_name(name)?;
        let vpn_cidr4 = validate::strict4("cidr4", cidr4)?;
        let vpn_cidr6 = validate::strict6("cidr6", cidr6)?;
        validate::host(host)?;
        let port = validate::port(port)?;
        let addr4 = narrow4(wgup_ipam::server_address(IpNet::V4(vpn_cidr4))?);
        let addr6 = narrow6(wgup_ipam::server_address(IpNet::V6(vpn_cidr6))?);

        let pair = keys.generate_key_pair()?;
        Ok(Self {
            private_key: pair.private_key,
            public_key: pair.public_key,
            vpn_iface: name.to_string(),
            vpn_cidr4,
            vpn_cidr6,
            addr4,
            addr6,
            host: host.to_string(),
            port,
            nat_iface: None,
            nat_cidr4: BTreeSet::new(),
            nat_cidr6: BTreeSet::new(),
            dns: Vec::new(),
            peers: BTreeMap::new(),
        })
    }

    /// Replaces the server key pair. Peers must re-import their configs.
    ///
    /// # Errors
    ///
    /// Returns a key error if the provider fails; the old keys are kept.
    pub fn rekey(&mut self, keys: &dyn KeyProvider) -> Result<()> {
        let pair = keys.generate_key_pair()?;
        self.private_key = pair.private_key;
        self.public_key = pair.public_key;
        Ok(())
    }

    /// Applies one attribute change.
    ///
    /// Renaming only changes the stored name; the [`ConfigStore`] re-keys
    /// its index and checks for collisions.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the new value is invalid. Nothing
    /// changes on error.
    ///
    /// [`ConfigStore`]: crate::ConfigStore
    pub fn apply(&mut self, attribute: InterfaceAttribute) -> Result<()> {
        match attribute {
            InterfaceAttribute::Name(name) => {
                validate::interface_name(&name)?;
                self.vpn_iface = name;
            }
            InterfaceAttribute::Host(host) => {
                validate::host(&host)?;
                self.host = host;
            }
            InterfaceAttribute::Port(port) => {
                self.port = validate::port(port)?;
            }
            InterfaceAttribute::NatIface(nat_iface) => self.set_nat_iface(nat_iface)?,
            InterfaceAttribute::Dns(servers) => self.dns = servers,
        }
        Ok(())
    }

    /// Enables NAT through `nat_iface`, or disables it with `None`.
    /// Disabling clears both NAT destination lists.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed interface name.
    pub fn set_nat_iface(&mut self, nat_iface: Option<String>) -> Result<()> {
        match nat_iface {
            Some(name) => {
                validate::nat_interface_name(&name)?;
                self.nat_iface = Some(name);
            }
            None => {
                self.nat_iface = None;
                self.nat_cidr4.clear();
                self.nat_cidr6.clear();
            }
        }
        Ok(())
    }

    /// Adds an IPv4 destination masqueraded through the NAT interface.
    /// Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns a validation error if NAT is disabled or `destination` has
    /// host bits set.
    pub fn add_nat_cidr4(&mut self, destination: Ipv4Net) -> Result<bool> {
        let destination = validate::strict4("nat cidr4", destination)?;
        self.require_nat()?;
        Ok(self.nat_cidr4.insert(destination))
    }

    /// Adds an IPv6 destination masqueraded through the NAT interface.
    /// Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns a validation error if NAT is disabled or `destination` has
    /// host bits set.
    pub fn add_nat_cidr6(&mut self, destination: Ipv6Net) -> Result<bool> {
        let destination = validate::strict6("nat cidr6", destination)?;
        self.require_nat()?;
        Ok(self.nat_cidr6.insert(destination))
    }

    /// Removes an IPv4 NAT destination.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NatDestinationMissing`] if it is not configured.
    pub fn remove_nat_cidr4(&mut self, destination: Ipv4Net) -> Result<()> {
        if self.nat_cidr4.remove(&destination) {
            Ok(())
        } else {
            Err(self.nat_missing(IpNet::V4(destination)))
        }
    }

    /// Removes an IPv6 NAT destination.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NatDestinationMissing`] if it is not configured.
    pub fn remove_nat_cidr6(&mut self, destination: Ipv6Net) -> Result<()> {
        if self.nat_cidr6.remove(&destination) {
            Ok(())
        } else {
            Err(self.nat_missing(IpNet::V6(destination)))
        }
    }

    fn require_nat(&self) -> Result<()> {
        if self.nat_iface.is_some() {
            Ok(())
        } else {
            Err(Error::validation(
                "nat_iface",
                format!(
                    "NAT is disabled on interface \"{}\"; set nat_iface first",
                    self.vpn_iface
                ),
            ))
        }
    }

    fn nat_missing(&self, destination: IpNet) -> Error {
        Error::NatDestinationMissing {
            interface: self.vpn_iface.clone(),
            destination,
        }
    }

    /// Creates a peer with fresh keys.
    ///
    /// Addresses that are not given are allocated as the lowest free
    /// address of the matching pool. Given addresses must be single hosts
    /// inside the pool that are neither reserved nor assigned.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad name or address, a conflict if
    /// the name or an address is taken, and an allocation error if a pool
    /// is exhausted. Keys are generated last, so nothing is consumed on
    /// error.
    pub fn create_peer(
        &mut self,
        keys: &dyn KeyProvider,
        name: &str,
        cidr4: Option<Ipv4Net>,
        cidr6: Option<Ipv6Net>,
    ) -> Result<&Peer> {
        validate::peer_name(name)?;
        if self.peers.contains_key(name) {
            return Err(Error::PeerExists {
                interface: self.vpn_iface.clone(),
                peer: name.to_string(),
            });
        }

        let cidr4 = match cidr4 {
            Some(address) => {
                self.check_address4(address, None)?;
                address
            }
            None => self.next_address4()?,
        };
        let cidr6 = match cidr6 {
            Some(address) => {
                self.check_address6(address, None)?;
                address
            }
            None => self.next_address6()?,
        };

        let peer = Peer::create(keys, name, cidr4, cidr6)?;
        Ok(&*self.peers.entry(name.to_string()).or_insert(peer))
    }

    /// Detaches and returns a peer. Its addresses become free again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PeerNotFound`] if there is no such peer.
    pub fn remove_peer(&mut self, name: &str) -> Result<Peer> {
        self.peers
            .remove(name)
            .ok_or_else(|| self.peer_not_found(name))
    }

    /// Replaces a peer's key pair and preshared key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PeerNotFound`] or a key error.
    pub fn rekey_peer(&mut self, name: &str, keys: &dyn KeyProvider) -> Result<()> {
        self.peer_mut(name)?.rekey(keys)
    }

    /// Applies one attribute change to a peer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PeerNotFound`], a validation error for a malformed
    /// value, or a conflict if the new name or address is taken.
    pub fn update_peer(&mut self, name: &str, attribute: PeerAttribute) -> Result<()> {
        self.peer(name)?;
        match attribute {
            PeerAttribute::Name(new_name) => {
                validate::peer_name(&new_name)?;
                if new_name == name {
                    return Ok(());
                }
                if self.peers.contains_key(&new_name) {
                    return Err(Error::PeerExists {
                        interface: self.vpn_iface.clone(),
                        peer: new_name,
                    });
                }
                let mut peer = self.remove_peer(name)?;
                peer.set_name(new_name.clone());
                self.peers.insert(new_name, peer);
            }
            PeerAttribute::Cidr4(address) => {
                self.check_address4(address, Some(name))?;
                self.peer_mut(name)?.set_cidr4(address);
            }
            PeerAttribute::Cidr6(address) => {
                self.check_address6(address, Some(name))?;
                self.peer_mut(name)?.set_cidr6(address);
            }
        }
        Ok(())
    }

    /// Looks up a peer by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PeerNotFound`] if there is no such peer.
    pub fn peer(&self, name: &str) -> Result<&Peer> {
        self.peers.get(name).ok_or_else(|| self.peer_not_found(name))
    }

    fn peer_mut(&mut self, name: &str) -> Result<&mut Peer> {
        let err = self.peer_not_found(name);
        self.peers.get_mut(name).ok_or(err)
    }

    fn peer_not_found(&self, name: &str) -> Error {
        Error::PeerNotFound {
            interface: self.vpn_iface.clone(),
            peer: name.to_string(),
        }
    }

    /// Peers sorted by name.
    pub fn peers(&self) -> impl ExactSizeIterator<Item = &Peer> {
        self.peers.values()
    }

    /// The lowest free IPv4 address, as a `/32`.
    ///
    /// # Errors
    ///
    /// Returns an allocation error if the pool is exhausted.
    pub fn next_address4(&self) -> Result<Ipv4Net> {
        let used = self.peers.values().map(|peer| IpNet::V4(peer.cidr4()));
        Ok(narrow4(wgup_ipam::next_address(IpNet::V4(self.vpn_cidr4), used)?))
    }

    /// The lowest free IPv6 address, as a `/128`.
    ///
    /// # Errors
    ///
    /// Returns an allocation error if the pool is exhausted.
    pub fn next_address6(&self) -> Result<Ipv6Net> {
        let used = self.peers.values().map(|peer| IpNet::V6(peer.cidr6()));
        Ok(narrow6(wgup_ipam::next_address(IpNet::V6(self.vpn_cidr6), used)?))
    }

    /// Number of addresses still free in the IPv4 and IPv6 pools.
    #[must_use]
    pub fn free_addresses(&self) -> (u128, u128) {
        let used4 = self.peers.values().map(|peer| IpNet::V4(peer.cidr4()));
        let used6 = self.peers.values().map(|peer| IpNet::V6(peer.cidr6()));
        (
            wgup_ipam::free_count(IpNet::V4(self.vpn_cidr4), used4),
            wgup_ipam::free_count(IpNet::V6(self.vpn_cidr6), used6),
        )
    }

    fn check_address4(&self, address: Ipv4Net, owner: Option<&str>) -> Result<()> {
        self.check_address(
            "cidr4",
            IpNet::V4(address),
            IpNet::V4(self.vpn_cidr4),
            IpNet::V4(self.addr4),
            owner,
        )
    }

    fn check_address6(&self, address: Ipv6Net, owner: Option<&str>) -> Result<()> {
        self.check_address(
            "cidr6",
            IpNet::V6(address),
            IpNet::V6(self.vpn_cidr6),
            IpNet::V6(self.addr6),
            owner,
        )
    }

    /// Checks that `address` may be held by the peer `owner` (or by a new
    /// peer when `owner` is `None`).
    fn check_address(
        &self,
        field: &'static str,
        address: IpNet,
        pool: IpNet,
        server: IpNet,
        owner: Option<&str>,
    ) -> Result<()> {
        if address.prefix_len() != address.max_prefix_len() {
            return Err(Error::validation(
                field,
                format!("{address} is a range; expected a single address"),
            ));
        }
        if !pool.contains(&address) {
            return Err(Error::validation(
                field,
                format!("{address} is outside pool {pool}"),
            ));
        }

        let in_use = |holder: String| Error::AddressInUse {
            address,
            owner: holder,
        };
        if address.addr() == pool.network() {
            return Err(in_use("the network address".into()));
        }
        if address.addr() == server.addr() {
            return Err(in_use("the server".into()));
        }
        let holder = self
            .peers
            .values()
            .filter(|peer| Some(peer.name()) != owner)
            .find(|peer| IpNet::V4(peer.cidr4()) == address || IpNet::V6(peer.cidr6()) == address);
        match holder {
            Some(peer) => Err(in_use(format!("peer \"{}\"", peer.name()))),
            None => Ok(()),
        }
    }

    /// Re-checks everything [`Interface::create`] and the peer operations
    /// guarantee, for an interface that was read from disk.
    ///
    /// # Errors
    ///
    /// Returns the first validation or conflict error found.
    pub(crate) fn verify(&self) -> Result<()> {
        validate::interface_name(&self.vpn_iface)?;
        validate::key_text("private_key", &self.private_key)?;
        validate::key_text("public_key", &self.public_key)?;
        validate::strict4("cidr4", self.vpn_cidr4)?;
        validate::strict6("cidr6", self.vpn_cidr6)?;
        validate::host(&self.host)?;
        validate::port(self.port)?;

        let addr4 = narrow4(wgup_ipam::server_address(IpNet::V4(self.vpn_cidr4))?);
        let addr6 = narrow6(wgup_ipam::server_address(IpNet::V6(self.vpn_cidr6))?);
        if self.addr4 != addr4 {
            return Err(Error::validation(
                "addr4",
                format!("{} is not the server address of {}", self.addr4, self.vpn_cidr4),
            ));
        }
        if self.addr6 != addr6 {
            return Err(Error::validation(
                "addr6",
                format!("{} is not the server address of {}", self.addr6, self.vpn_cidr6),
            ));
        }

        match &self.nat_iface {
            Some(nat_iface) => validate::nat_interface_name(nat_iface)?,
            None if !self.nat_cidr4.is_empty() || !self.nat_cidr6.is_empty() => {
                self.require_nat()?;
            }
            None => {}
        }
        for destination in &self.nat_cidr4 {
            validate::strict4("nat_cidr4", *destination)?;
        }
        for destination in &self.nat_cidr6 {
            validate::strict6("nat_cidr6", *destination)?;
        }

        for peer in self.peers.values() {
            validate::peer_name(peer.name())?;
            validate::key_text("private_key", peer.private_key())?;
            validate::key_text("public_key", peer.public_key())?;
            validate::key_text("preshared_key", peer.preshared_key())?;
            self.check_address4(peer.cidr4(), Some(peer.name()))?;
            self.check_address6(peer.cidr6(), Some(peer.name()))?;
        }
        Ok(())
    }

    /// Interface name, also the `wg-quick` unit instance.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.vpn_iface
    }

    /// Base64 server private key.
    #[must_use]
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Base64 server public key.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// IPv4 pool.
    #[must_use]
    pub const fn vpn_cidr4(&self) -> Ipv4Net {
        self.vpn_cidr4
    }

    /// IPv6 pool.
    #[must_use]
    pub const fn vpn_cidr6(&self) -> Ipv6Net {
        self.vpn_cidr6
    }

    /// Server IPv4 address with the pool's prefix.
    #[must_use]
    pub const fn addr4(&self) -> Ipv4Net {
        self.addr4
    }

    /// Server IPv6 address with the pool's prefix.
    #[must_use]
    pub const fn addr6(&self) -> Ipv6Net {
        self.addr6
    }

    /// Endpoint host peers connect to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// UDP listen port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// NAT egress interface, if NAT is enabled.
    #[must_use]
    pub fn nat_iface(&self) -> Option<&str> {
        self.nat_iface.as_deref()
    }

    /// IPv4 destinations masqueraded through the NAT interface.
    #[must_use]
    pub const fn nat_cidr4(&self) -> &BTreeSet<Ipv4Net> {
        &self.nat_cidr4
    }

    /// IPv6 destinations masqueraded through the NAT interface.
    #[must_use]
    pub const fn nat_cidr6(&self) -> &BTreeSet<Ipv6Net> {
        &self.nat_cidr6
    }

    /// DNS servers pushed to peers.
    #[must_use]
    pub fn dns(&self) -> &[IpAddr] {
        &self.dns
    }
}

impl Named for Interface {
    fn name(&self) -> &str {
        &self.vpn_iface
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("vpn_iface", &self.vpn_iface)
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .field("vpn_cidr4", &self.vpn_cidr4)
            .field("vpn_cidr6", &self.vpn_cidr6)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("nat_iface", &self.nat_iface)
            .field("peers", &self.peers.len())
            .finish_non_exhaustive()
    }
}

fn narrow4(net: IpNet) -> Ipv4Net {
    match net {
        IpNet::V4(net) => net,
        IpNet::V6(_) => unreachable!("IPv4 pool yielded an IPv6 address"),
    }
}

fn narrow6(net: IpNet) -> Ipv6Net {
    match net {
        IpNet::V6(net) => net,
        IpNet::V4(_) => unreachable!("IPv6 pool yielded an IPv4 address"),
    }
}

/// Persists "NAT disabled" as an empty string.
mod nat_iface_field {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub(super) fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or_default())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.filter(|name| !name.is_empty()))
    }
}
