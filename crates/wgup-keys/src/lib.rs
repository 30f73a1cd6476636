//! WireGuard key material for wgup.
//!
//! The domain model treats keys as opaque base64 strings. This crate is the
//! only place that knows how those strings are produced: either natively
//! with Curve25519 ([`NativeKeys`]) or by shelling out to the `wg` tool
//! ([`WgTool`]).

#![forbid(unsafe_code)]

pub mod error;
mod keys;
mod provider;

pub use error::KeyError;
pub use keys::{KEY_SIZE, PresharedKey, PrivateKey, PublicKey};
pub use provider::{EncodedKeyPair, KeyProvider, NativeKeys, WgTool};
