//! A client of an interface.

use std::fmt;

use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};
use wgup_keys::KeyProvider;

use crate::error::Result;
use crate::named::Named;
use crate::validate;

/// A peer: its own key pair, a preshared key shared with the server and one
/// host address from each of the interface's pools.
///
/// Peers are created and mutated through their [`Interface`], which keeps
/// names and addresses unique.
///
/// [`Interface`]: crate::Interface
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    name: String,
    private_key: String,
    public_key: String,
    preshared_key: String,
    cidr4: Ipv4Net,
    cidr6: Ipv6Net,
}

impl Peer {
    /// Validates `name` and generates fresh key material for a peer holding
    /// `cidr4` and `cidr6`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad name, or a key error if the
    /// provider fails.
    pub fn create(
        keys: &dyn KeyProvider,
        name: &str,
        cidr4: Ipv4Net,
        cidr6: Ipv6Net,
    ) -> Result<Self> {
        validate::peer_name(name)?;
        let pair = keys.generate_key_pair()?;
        let preshared_key = keys.generate_preshared_key()?;
        Ok(Self {
            name: name.to_string(),
            private_key: pair.private_key,
            public_key: pair.public_key,
            preshared_key,
            cidr4,
            cidr6,
        })
    }

    /// Replaces the key pair and preshared key.
    ///
    /// Nothing changes unless all three keys are generated.
    ///
    /// # Errors
    ///
    /// Returns a key error if the provider fails.
    pub fn rekey(&mut self, keys: &dyn KeyProvider) -> Result<()> {
        let pair = keys.generate_key_pair()?;
        let preshared_key = keys.generate_preshared_key()?;
        self.private_key = pair.private_key;
        self.public_key = pair.public_key;
        self.preshared_key = preshared_key;
        Ok(())
    }

    /// Peer name, unique within its interface.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base64 private key.
    #[must_use]
    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Base64 public key.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Base64 preshared key.
    #[must_use]
    pub fn preshared_key(&self) -> &str {
        &self.preshared_key
    }

    /// IPv4 host address (`/32`).
    #[must_use]
    pub const fn cidr4(&self) -> Ipv4Net {
        self.cidr4
    }

    /// IPv6 host address (`/128`).
    #[must_use]
    pub const fn cidr6(&self) -> Ipv6Net {
        self.cidr6
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_cidr4(&mut self, cidr4: Ipv4Net) {
        self.cidr4 = cidr4;
    }

    pub(crate) fn set_cidr6(&mut self, cidr6: Ipv6Net) {
        self.cidr6 = cidr6;
    }
}

impl Named for Peer {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("name", &self.name)
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .field("preshared_key", &"[REDACTED]")
            .field("cidr4", &self.cidr4)
            .field("cidr6", &self.cidr6)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeKeys;

    fn addrs() -> (Ipv4Net, Ipv6Net) {
        (
            "10.8.0.2/32".parse().expect("v4"),
            "fd00::2/128".parse().expect("v6"),
        )
    }

    #[test]
    fn create_assigns_keys_and_addresses() {
        let keys = FakeKeys::default();
        let (v4, v6) = addrs();
        let peer = Peer::create(&keys, "laptop", v4, v6).expect("create");
        assert_eq!(peer.name(), "laptop");
        assert_eq!(peer.private_key(), "private-1");
        assert_eq!(peer.public_key(), "public(private-1)");
        assert_eq!(peer.preshared_key(), "psk-2");
        assert_eq!(peer.cidr4(), v4);
        assert_eq!(peer.cidr6(), v6);
    }

    #[test]
    fn create_rejects_bad_name_before_generating_keys() {
        let keys = FakeKeys::default();
        let (v4, v6) = addrs();
        assert!(Peer::create(&keys, "9lives", v4, v6).is_err());
        assert_eq!(keys.generated(), 0);
    }

    #[test]
    fn rekey_replaces_all_keys() {
        let keys = FakeKeys::default();
        let (v4, v6) = addrs();
        let mut peer = Peer::create(&keys, "laptop", v4, v6).expect("create");
        let before = peer.clone();
        peer.rekey(&keys).expect("rekey");
        assert_ne!(peer.private_key(), before.private_key());
        assert_ne!(peer.public_key(), before.public_key());
        assert_ne!(peer.preshared_key(), before.preshared_key());
        assert_eq!(peer.cidr4(), before.cidr4());
    }

    #[test]
    fn failed_rekey_leaves_keys_untouched() {
        let keys = FakeKeys::default();
        let (v4, v6) = addrs();
        let mut peer = Peer::create(&keys, "laptop", v4, v6).expect("create");
        let before = peer.clone();
        assert!(peer.rekey(&FakeKeys::failing()).is_err());
        assert_eq!(peer, before);
    }

    #[test]
    fn debug_redacts_secrets() {
        let keys = FakeKeys::default();
        let (v4, v6) = addrs();
        let peer = Peer::create(&keys, "laptop", v4, v6).expect("create");
        let debug = format!("{peer:?}");
        assert!(debug.contains("private_key: \"[REDACTED]\""));
        assert!(!debug.contains("psk-2"));
        assert!(debug.contains("public(private-1)"));
    }

    #[test]
    fn serializes_with_expected_field_names() {
        let keys = FakeKeys::default();
        let (v4, v6) = addrs();
        let peer = Peer::create(&keys, "laptop", v4, v6).expect("create");
        let json = serde_json::to_value(&peer).expect("json");
        assert_eq!(json["name"], "laptop");
        assert_eq!(json["cidr4"], "10.8.0.2/32");
        assert_eq!(json["cidr6"], "fd00::2/128");
        assert_eq!(json["preshared_key"], "psk-2");
    }
}
