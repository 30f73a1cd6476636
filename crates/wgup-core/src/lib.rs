//! Domain model for wgup.
//!
//! An [`Interface`] is one WireGuard network: a server key pair, an IPv4 and
//! an IPv6 pool, an endpoint, optional NAT egress and the [`Peer`]s allowed
//! to join. The [`ConfigStore`] owns every interface and persists them as a
//! single versioned JSON document. The [`render`] module turns entities into
//! the text consumed by `wg-quick`.
//!
//! Key material comes from a [`wgup_keys::KeyProvider`]; peer addresses come
//! from [`wgup_ipam`].

#![forbid(unsafe_code)]

pub mod attribute;
pub mod error;
pub mod interface;
mod named;
pub mod peer;
pub mod render;
pub mod store;
pub mod validate;

#[cfg(test)]
mod test_support;

pub use attribute::{InterfaceAttribute, PeerAttribute};
pub use error::{Error, ErrorKind, Result};
pub use interface::Interface;
pub use peer::Peer;
pub use store::{CONFIG_VERSION, ConfigStore, INTERFACES_FILE, NewInterface};
