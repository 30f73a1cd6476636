//! Curve25519 key material.
//!
//! Keys travel as standard base64 of 32 bytes, the form `wg genkey` prints
//! and `wg-quick` configs expect.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::error::KeyError;

/// Length in bytes of every `WireGuard` key.
pub const KEY_SIZE: usize = 32;

type KeyBytes = [u8; KEY_SIZE];

fn decode(text: &str) -> Result<KeyBytes, KeyError> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| KeyError::InvalidBase64(e.to_string()))?;
    KeyBytes::try_from(bytes.as_slice()).map_err(|_| KeyError::InvalidKeyLength(bytes.len()))
}

fn random_bytes() -> KeyBytes {
    let mut bytes = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// A peer or server public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(KeyBytes);

impl PublicKey {
    /// Raw key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &KeyBytes {
        &self.0
    }

    /// Base64 form.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parses the base64 form.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] for bad base64 or a length other than 32 bytes.
    pub fn from_base64(text: &str) -> Result<Self, KeyError> {
        decode(text).map(Self)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

/// A private key. Compared in constant time and never printed by `Debug`.
#[derive(Clone)]
pub struct PrivateKey(KeyBytes);

impl PrivateKey {
    /// A fresh clamped Curve25519 secret from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(OsRng).to_bytes())
    }

    /// Wraps existing secret bytes.
    #[must_use]
    pub const fn from_bytes(bytes: KeyBytes) -> Self {
        Self(bytes)
    }

    /// The matching public key.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(self.0);
        PublicKey(X25519PublicKey::from(&secret).to_bytes())
    }

    /// Base64 form.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Parses the base64 form.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError`] for bad base64 or a length other than 32 bytes.
    pub fn from_base64(text: &str) -> Result<Self, KeyError> {
        decode(text).map(Self)
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey([REDACTED])")
    }
}

/// A symmetric key shared by the server and one peer.
#[derive(Clone)]
pub struct PresharedKey(KeyBytes);

impl PresharedKey {
    /// 32 random bytes from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_bytes())
    }

    /// Base64 form.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl PartialEq for PresharedKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for PresharedKey {}

impl fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PresharedKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7748 section 6.1, Alice.
    const RFC7748_PRIVATE: KeyBytes = [
        0x77, 0x07, 0x6d, 0x0a, 0x73, 0x18, 0xa5, 0x7d, 0x3c, 0x16, 0xc1, 0x72, 0x51, 0xb2, 0x66,
        0x45, 0xdf, 0x4c, 0x2f, 0x87, 0xeb, 0xc0, 0x99, 0x2a, 0xb1, 0x77, 0xfb, 0xa5, 0x1d, 0xb9,
        0x2c, 0x2a,
    ];
    const RFC7748_PUBLIC: KeyBytes = [
        0x85, 0x20, 0xf0, 0x09, 0x89, 0x30, 0xa7, 0x54, 0x74, 0x8b, 0x7d, 0xdc, 0xb4, 0x3e, 0xf7,
        0x5a, 0x0d, 0xbf, 0x3a, 0x0d, 0x26, 0x38, 0x1a, 0xf4, 0xeb, 0xa4, 0xa9, 0x8e, 0xaa, 0x9b,
        0x4e, 0x6a,
    ];

    #[test]
    fn derives_rfc7748_public_key() {
        let private = PrivateKey::from_bytes(RFC7748_PRIVATE);
        assert_eq!(private.public_key().as_bytes(), &RFC7748_PUBLIC);
    }

    #[test]
    fn generated_keys_are_distinct() {
        let a = PrivateKey::generate();
        let b = PrivateKey::generate();
        assert_ne!(a, b);
        assert_ne!(a.public_key(), b.public_key());
        assert_ne!(PresharedKey::generate(), PresharedKey::generate());
    }

    #[test]
    fn base64_form_matches_wg() {
        let private = PrivateKey::generate();
        let encoded = private.to_base64();
        assert_eq!(encoded.len(), 44);
        assert!(encoded.ends_with('='));
        let decoded = PrivateKey::from_base64(&format!("{encoded}\n")).expect("trailing newline");
        assert_eq!(decoded, private);
    }

    #[test]
    fn debug_hides_secrets() {
        let private = PrivateKey::generate();
        let debug = format!("{private:?}");
        assert_eq!(debug, "PrivateKey([REDACTED])");
        assert!(!debug.contains(&private.to_base64()));
        assert_eq!(
            format!("{:?}", PresharedKey::generate()),
            "PresharedKey([REDACTED])"
        );
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(matches!(
            PublicKey::from_base64("not base64!"),
            Err(KeyError::InvalidBase64(_))
        ));
        assert!(matches!(
            PrivateKey::from_base64("AAAA"),
            Err(KeyError::InvalidKeyLength(3))
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn public_keys_survive_base64(bytes in prop::array::uniform32(any::<u8>())) {
                let key = PublicKey(bytes);
                prop_assert_eq!(PublicKey::from_base64(&key.to_base64()).expect("decodes"), key);
            }

            #[test]
            fn derivation_ignores_encoding(bytes in prop::array::uniform32(any::<u8>())) {
                let private = PrivateKey::from_bytes(bytes);
                let reparsed = PrivateKey::from_base64(&private.to_base64()).expect("decodes");
                prop_assert_eq!(private.public_key(), reparsed.public_key());
            }
        }
    }
}
