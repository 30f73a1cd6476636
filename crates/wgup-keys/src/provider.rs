//! Key providers.
//!
//! A [`KeyProvider`] hands out opaque base64 key strings. Callers never look
//! inside them.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::KeyError;
use crate::keys::{PresharedKey, PrivateKey};

/// A private key together with the public key derived from it.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedKeyPair {
    /// Base64 private key.
    pub private_key: String,
    /// Base64 public key.
    pub public_key: String,
}

impl std::fmt::Debug for EncodedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedKeyPair")
            .field("private_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Source of `WireGuard` key material.
pub trait KeyProvider {
    /// Generates a fresh private key.
    fn generate_private_key(&self) -> Result<String, KeyError>;

    /// Derives the public key belonging to `private_key`.
    fn public_key(&self, private_key: &str) -> Result<String, KeyError>;

    /// Generates a fresh preshared key.
    fn generate_preshared_key(&self) -> Result<String, KeyError>;

    /// Generates a private key and derives its public key.
    fn generate_key_pair(&self) -> Result<EncodedKeyPair, KeyError> {
        let private_key = self.generate_private_key()?;
        let public_key = self.public_key(&private_key)?;
        Ok(EncodedKeyPair {
            private_key,
            public_key,
        })
    }
}

/// In-process Curve25519 key generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeKeys;

impl KeyProvider for NativeKeys {
    fn generate_private_key(&self) -> Result<String, KeyError> {
        Ok(PrivateKey::generate().to_base64())
    }

    fn public_key(&self, private_key: &str) -> Result<String, KeyError> {
        Ok(PrivateKey::from_base64(private_key)?.public_key().to_base64())
    }

    fn generate_preshared_key(&self) -> Result<String, KeyError> {
        Ok(PresharedKey::generate().to_base64())
    }
}

/// Key generation through the `wg` command line tool
/// (`wg genkey`, `wg pubkey`, `wg genpsk`).
#[derive(Debug, Clone)]
pub struct WgTool {
    binary: PathBuf,
}

impl WgTool {
    /// Creates a provider that runs the given `wg` binary.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, subcommand: &str, input: Option<&str>) -> Result<String, KeyError> {
        let command = format!("{} {subcommand}", self.binary.display());
        let tool_error = |message: String| KeyError::Tool {
            command: command.clone(),
            message,
        };
        debug!(command = %command, "running key tool");

        let mut child = Command::new(&self.binary)
            .arg(subcommand)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| tool_error(e.to_string()))?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| tool_error(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| tool_error(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(tool_error(format!("{}: {}", output.status, stderr.trim())));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| tool_error(e.to_string()))?;
        Ok(stdout.trim().to_string())
    }
}

impl Default for WgTool {
    fn default() -> Self {
        Self::new("wg")
    }
}

impl KeyProvider for WgTool {
    fn generate_private_key(&self) -> Result<String, KeyError> {
        self.run("genkey", None)
    }

    fn public_key(&self, private_key: &str) -> Result<String, KeyError> {
        self.run("pubkey", Some(private_key))
    }

    fn generate_preshared_key(&self) -> Result<String, KeyError> {
        self.run("genpsk", None)
    }
}
