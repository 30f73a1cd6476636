//! Error types for the domain model.

use std::path::PathBuf;

use ipnet::IpNet;
use thiserror::Error;
use wgup_ipam::AllocationError;
use wgup_keys::KeyError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by interface, peer and store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed name, CIDR, port or other input.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Which input was rejected.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The named interface does not exist.
    #[error("interface \"{0}\" does not exist")]
    InterfaceNotFound(String),

    /// The named peer does not exist on the interface.
    #[error("peer \"{peer}\" does not exist on interface \"{interface}\"")]
    PeerNotFound {
        /// Interface that was searched.
        interface: String,
        /// Missing peer.
        peer: String,
    },

    /// An interface with this name already exists.
    #[error("interface \"{0}\" already exists")]
    InterfaceExists(String),

    /// A peer with this name already exists on the interface.
    #[error("peer \"{peer}\" already exists on interface \"{interface}\"")]
    PeerExists {
        /// Interface holding the existing peer.
        interface: String,
        /// Duplicate name.
        peer: String,
    },

    /// The address is reserved or assigned to another peer.
    #[error("address {address} is already in use by {owner}")]
    AddressInUse {
        /// Requested address.
        address: IpNet,
        /// Who holds it ("the server", "the network", or a peer).
        owner: String,
    },

    /// Removing a NAT destination that is not configured.
    #[error("NAT destination {destination} does not exist on interface \"{interface}\"")]
    NatDestinationMissing {
        /// Interface that was searched.
        interface: String,
        /// Destination that was not found.
        destination: IpNet,
    },

    /// The persisted document was written by an incompatible version.
    #[error("incompatible config version {found} in {} (expected {expected})", path.display())]
    ConfigVersion {
        /// Document location.
        path: PathBuf,
        /// Version found on disk.
        found: i64,
        /// Version this build understands.
        expected: u32,
    },

    /// Address allocation failed.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// The key provider failed.
    #[error("key generation failed: {0}")]
    Keys(#[from] KeyError),

    /// The persisted document is not valid JSON for this schema.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Document location.
        path: PathBuf,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the document failed.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Reading or writing the document failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of [`Error`] for callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; nothing changed.
    Validation,
    /// A referenced interface or peer is missing; nothing changed.
    NotFound,
    /// Duplicate name, taken address, or missing NAT destination.
    Conflict,
    /// Persisted schema version mismatch. Not recoverable.
    ConfigVersion,
    /// The pool has no free address; no entity was created.
    AllocationExhausted,
    /// Key material could not be produced.
    Keys,
    /// The persisted document is unreadable. Not recoverable.
    Parse,
    /// Filesystem failure.
    Io,
}

impl Error {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the taxonomy bucket of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::Allocation(AllocationError::PoolTooSmall { .. }) => {
                ErrorKind::Validation
            }
            Self::InterfaceNotFound(_) | Self::PeerNotFound { .. } => ErrorKind::NotFound,
            Self::InterfaceExists(_)
            | Self::PeerExists { .. }
            | Self::AddressInUse { .. }
            | Self::NatDestinationMissing { .. } => ErrorKind::Conflict,
            Self::ConfigVersion { .. } => ErrorKind::ConfigVersion,
            Self::Allocation(AllocationError::PoolExhausted { .. }) => {
                ErrorKind::AllocationExhausted
            }
            Self::Keys(_) => ErrorKind::Keys,
            Self::Parse { .. } | Self::Serialize(_) => ErrorKind::Parse,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Whether the process must stop instead of continuing with the store.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConfigVersion | ErrorKind::Parse)
    }
}
