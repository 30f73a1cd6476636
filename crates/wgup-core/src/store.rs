//! Persistent store of every interface.
//!
//! The whole configuration is one JSON document:
//!
//! ```text
//! {
//!     "version": 1,
//!     "interfaces": [ { "vpn_iface": "wg0", ..., "peers": [ ... ] } ]
//! }
//! ```
//!
//! Interfaces and peers are written sorted by name so diffs stay small.
//! Every mutating operation runs inside [`ConfigStore::transact`]: the
//! change is saved before the call returns, and on any failure the
//! in-memory state is rolled back.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ipnet::{Ipv4Net, Ipv6Net};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wgup_keys::KeyProvider;

use crate::attribute::{InterfaceAttribute, PeerAttribute};
use crate::error::{Error, Result};
use crate::interface::Interface;
use crate::peer::Peer;
use crate::validate;

/// Schema version written to and required from the document.
pub const CONFIG_VERSION: u32 = 1;

/// File name of the document inside the configuration directory.
pub const INTERFACES_FILE: &str = "interfaces.json";

/// Parameters for [`ConfigStore::create_interface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInterface {
    /// Interface name.
    pub name: String,
    /// IPv4 pool.
    pub cidr4: Ipv4Net,
    /// IPv6 pool.
    pub cidr6: Ipv6Net,
    /// Endpoint host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// NAT egress interface; `None` leaves NAT disabled.
    pub nat_iface: Option<String>,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: i64,
}

#[derive(Deserialize)]
struct Document {
    #[serde(deserialize_with = "crate::named::deserialize")]
    interfaces: BTreeMap<String, Interface>,
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    interfaces: Vec<&'a Interface>,
}

/// All interfaces, backed by one JSON file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    interfaces: BTreeMap<String, Interface>,
}

impl ConfigStore {
    /// Loads `<dir>/interfaces.json`.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::load`].
    pub fn open(dir: &Path) -> Result<Self> {
        Self::load(dir.join(INTERFACES_FILE))
    }

    /// Loads the document at `path`. A missing file yields an empty store;
    /// nothing is written until the first mutation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigVersion`] if the document's version differs
    /// from [`CONFIG_VERSION`], [`Error::Parse`] if it is malformed, and
    /// [`Error::Io`] if it cannot be read. All three are fatal.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration found, starting empty");
                return Ok(Self {
                    path,
                    interfaces: BTreeMap::new(),
                });
            }
            Err(source) => return Err(Error::Io { path, source }),
        };
        Self::from_json(path, &text)
    }

    /// Parses a document that claims to live at `path`.
    ///
    /// The version is checked before the rest of the document is looked at,
    /// so a foreign schema is reported as a version error, not a parse
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigVersion`], or [`Error::Parse`] for malformed
    /// JSON and for entities that break an invariant (a bad name, a server
    /// address that is not the pool's, a peer outside its pool or sharing
    /// an address).
    pub fn from_json(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let parse_error = |source| Error::Parse {
            path: path.clone(),
            source,
        };

        let probe: VersionProbe = serde_json::from_str(text).map_err(parse_error)?;
        if probe.version != i64::from(CONFIG_VERSION) {
            return Err(Error::ConfigVersion {
                path,
                found: probe.version,
                expected: CONFIG_VERSION,
            });
        }

        let document: Document = serde_json::from_str(text).map_err(parse_error)?;
        for iface in document.interfaces.values() {
            iface.verify().map_err(|e| {
                parse_error(serde_json::Error::custom(format!(
                    "interface \"{}\": {e}",
                    iface.name()
                )))
            })?;
        }
        debug!(
            path = %path.display(),
            interfaces = document.interfaces.len(),
            "loaded configuration"
        );
        Ok(Self {
            path,
            interfaces: document.interfaces,
        })
    }

    /// Serializes the store as pretty JSON with four-space indentation and
    /// a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialize`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let document = DocumentRef {
            version: CONFIG_VERSION,
            interfaces: self.interfaces.values().collect(),
        };
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        document
            .serialize(&mut serializer)
            .map_err(Error::Serialize)?;
        buffer.push(b'\n');
        String::from_utf8(buffer).map_err(|e| Error::Serialize(serde_json::Error::custom(e)))
    }

    /// Writes the document back to its path, creating the directory if
    /// needed. The file is replaced atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let json = self.to_json()?;
        write_atomic(&self.path, json.as_bytes())?;
        debug!(
            path = %self.path.display(),
            interfaces = self.interfaces.len(),
            "saved configuration"
        );
        Ok(())
    }

    /// Runs `op` against the store and saves the result.
    ///
    /// If `op` or the save fails, the in-memory state is restored to what
    /// it was before the call, so memory and disk never disagree.
    ///
    /// # Errors
    ///
    /// Returns whatever `op` or [`ConfigStore::save`] returned.
    pub fn transact<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.interfaces.clone();
        let outcome = op(&mut *self).and_then(|value| self.save().map(|()| value));
        if outcome.is_err() {
            self.interfaces = snapshot;
        }
        outcome
    }

    /// Location of the document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Interfaces sorted by name.
    pub fn interfaces(&self) -> impl ExactSizeIterator<Item = &Interface> {
        self.interfaces.values()
    }

    /// Looks up an interface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`] if there is no such interface.
    pub fn interface(&self, name: &str) -> Result<&Interface> {
        self.interfaces
            .get(name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
    }

    /// Looks up an interface for mutation. Changes made through this
    /// reference are not saved unless they happen inside
    /// [`ConfigStore::transact`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`] if there is no such interface.
    pub fn interface_mut(&mut self, name: &str) -> Result<&mut Interface> {
        self.interfaces
            .get_mut(name)
            .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
    }

    /// Creates and saves a new interface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceExists`] if the name is taken (checked
    /// before any key is generated), or any error from
    /// [`Interface::create`] or [`ConfigStore::save`].
    pub fn create_interface(
        &mut self,
        keys: &dyn KeyProvider,
        new: NewInterface,
    ) -> Result<&Interface> {
        if self.interfaces.contains_key(&new.name) {
            return Err(Error::InterfaceExists(new.name));
        }
        if let Some(nat_iface) = &new.nat_iface {
            validate::nat_interface_name(nat_iface)?;
        }

        let name = new.name.clone();
        self.transact(move |store| {
            let mut iface =
                Interface::create(keys, &new.name, new.cidr4, new.cidr6, &new.host, new.port)?;
            iface.set_nat_iface(new.nat_iface)?;
            store.interfaces.insert(new.name, iface);
            Ok(())
        })?;
        info!(interface = %name, "created interface");
        self.interface(&name)
    }

    /// Removes and returns an interface with all its peers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`] or a save error.
    pub fn remove_interface(&mut self, name: &str) -> Result<Interface> {
        let removed = self.transact(|store| {
            store
                .interfaces
                .remove(name)
                .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
        })?;
        info!(interface = %name, peers = removed.peers().len(), "removed interface");
        Ok(removed)
    }

    /// Changes one interface attribute. Renaming re-keys the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`], [`Error::InterfaceExists`] when
    /// renaming onto a taken name, a validation error, or a save error.
    pub fn update_interface(&mut self, name: &str, attribute: InterfaceAttribute) -> Result<()> {
        let change = attribute.to_string();
        self.transact(|store| {
            if let InterfaceAttribute::Name(new_name) = &attribute {
                if new_name != name && store.interfaces.contains_key(new_name) {
                    return Err(Error::InterfaceExists(new_name.clone()));
                }
            }
            let mut iface = store
                .interfaces
                .remove(name)
                .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?;
            iface.apply(attribute)?;
            store.interfaces.insert(iface.name().to_string(), iface);
            Ok(())
        })?;
        debug!(interface = %name, %change, "updated interface");
        Ok(())
    }

    /// Replaces an interface's key pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`], a key error, or a save error.
    pub fn rekey_interface(&mut self, name: &str, keys: &dyn KeyProvider) -> Result<()> {
        self.transact(|store| store.interface_mut(name)?.rekey(keys))?;
        info!(interface = %name, "rekeyed interface");
        Ok(())
    }

    /// Adds NAT destinations. At least one of `cidr4` and `cidr6` must be
    /// given; re-adding an existing destination is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`], a validation error if NAT is
    /// disabled or no destination was given, or a save error.
    pub fn add_nat(
        &mut self,
        name: &str,
        cidr4: Option<Ipv4Net>,
        cidr6: Option<Ipv6Net>,
    ) -> Result<()> {
        require_destination(cidr4.is_some() || cidr6.is_some())?;
        self.transact(|store| {
            let iface = store.interface_mut(name)?;
            if let Some(cidr4) = cidr4 {
                iface.add_nat_cidr4(cidr4)?;
            }
            if let Some(cidr6) = cidr6 {
                iface.add_nat_cidr6(cidr6)?;
            }
            Ok(())
        })?;
        debug!(interface = %name, ?cidr4, ?cidr6, "added NAT destinations");
        Ok(())
    }

    /// Removes NAT destinations. Both must exist when both are given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`],
    /// [`Error::NatDestinationMissing`], or a save error.
    pub fn remove_nat(
        &mut self,
        name: &str,
        cidr4: Option<Ipv4Net>,
        cidr6: Option<Ipv6Net>,
    ) -> Result<()> {
        require_destination(cidr4.is_some() || cidr6.is_some())?;
        self.transact(|store| {
            let iface = store.interface_mut(name)?;
            if let Some(cidr4) = cidr4 {
                iface.remove_nat_cidr4(cidr4)?;
            }
            if let Some(cidr6) = cidr6 {
                iface.remove_nat_cidr6(cidr6)?;
            }
            Ok(())
        })?;
        debug!(interface = %name, ?cidr4, ?cidr6, "removed NAT destinations");
        Ok(())
    }

    /// Creates and saves a peer. Missing addresses are allocated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`], any error from
    /// [`Interface::create_peer`], or a save error.
    pub fn create_peer(
        &mut self,
        interface: &str,
        keys: &dyn KeyProvider,
        name: &str,
        cidr4: Option<Ipv4Net>,
        cidr6: Option<Ipv6Net>,
    ) -> Result<Peer> {
        let peer = self.transact(|store| {
            store
                .interface_mut(interface)?
                .create_peer(keys, name, cidr4, cidr6)
                .cloned()
        })?;
        info!(
            interface = %interface,
            peer = %name,
            cidr4 = %peer.cidr4(),
            cidr6 = %peer.cidr6(),
            "created peer"
        );
        Ok(peer)
    }

    /// Removes and returns a peer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`], [`Error::PeerNotFound`], or a
    /// save error.
    pub fn remove_peer(&mut self, interface: &str, name: &str) -> Result<Peer> {
        let peer = self.transact(|store| store.interface_mut(interface)?.remove_peer(name))?;
        info!(interface = %interface, peer = %name, "removed peer");
        Ok(peer)
    }

    /// Changes one peer attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`], any error from
    /// [`Interface::update_peer`], or a save error.
    pub fn update_peer(
        &mut self,
        interface: &str,
        name: &str,
        attribute: PeerAttribute,
    ) -> Result<()> {
        let change = attribute.to_string();
        self.transact(|store| store.interface_mut(interface)?.update_peer(name, attribute))?;
        debug!(interface = %interface, peer = %name, %change, "updated peer");
        Ok(())
    }

    /// Replaces a peer's keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceNotFound`], [`Error::PeerNotFound`], a key
    /// error, or a save error.
    pub fn rekey_peer(&mut self, interface: &str, name: &str, keys: &dyn KeyProvider) -> Result<()> {
        self.transact(|store| store.interface_mut(interface)?.rekey_peer(name, keys))?;
        info!(interface = %interface, peer = %name, "rekeyed peer");
        Ok(())
    }
}

fn require_destination(given: bool) -> Result<()> {
    if given {
        Ok(())
    } else {
        Err(Error::validation(
            "nat destination",
            "give an IPv4 and/or an IPv6 CIDR",
        ))
    }
}

/// Replaces `path` with `contents` by writing a sibling temporary file and
/// renaming it over the target. Missing parent directories are created. On
/// Unix the file is created with mode `0600`.
///
/// # Errors
///
/// Returns [`Error::Io`] naming the file that failed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| Error::Io { path, source }
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    write_private(&tmp, contents).map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        io_error(path)(source)
    })
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
