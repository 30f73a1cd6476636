//! Deterministic key provider for unit tests.

use std::cell::Cell;

use wgup_keys::{KeyError, KeyProvider};

/// Hands out `private-N` / `psk-N` from a shared counter and derives
/// `public(<private>)`.
#[derive(Debug, Default)]
pub(crate) struct FakeKeys {
    counter: Cell<u32>,
    fail: bool,
}

impl FakeKeys {
    pub(crate) fn failing() -> Self {
        Self {
            counter: Cell::new(0),
            fail: true,
        }
    }

    /// Number of private and preshared keys generated so far.
    pub(crate) fn generated(&self) -> u32 {
        self.counter.get()
    }

    fn next(&self, prefix: &str) -> Result<String, KeyError> {
        if self.fail {
            return Err(KeyError::Tool {
                command: "fake".into(),
                message: "unavailable".into(),
            });
        }
        let n = self.counter.get() + 1;
        self.counter.set(n);
        Ok(format!("{prefix}-{n}"))
    }
}

impl KeyProvider for FakeKeys {
    fn generate_private_key(&self) -> Result<String, KeyError> {
        self.next("private")
    }

    fn public_key(&self, private_key: &str) -> Result<String, KeyError> {
        Ok(format!("public({private_key})"))
    }

    fn generate_preshared_key(&self) -> Result<String, KeyError> {
        self.next("psk")
    }
}
