//! Runtime settings collected from flags and environment.

use std::path::PathBuf;

use clap::ValueEnum;
use wgup_keys::{KeyProvider, NativeKeys, WgTool};

use crate::cli::Cli;
use crate::service::Systemd;

/// Which [`KeyProvider`] generates key material.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum KeyBackend {
    /// In-process Curve25519
    #[default]
    Native,
    /// The `wg` command line tool
    Wg,
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding `interfaces.json`.
    pub config_dir: PathBuf,
    /// Destination directory of `iface sync`.
    pub wireguard_dir: PathBuf,
    /// Key generation backend.
    pub keygen: KeyBackend,
    /// `wg` binary for [`KeyBackend::Wg`].
    pub wg_binary: PathBuf,
    /// `systemctl` binary for service control.
    pub systemctl: PathBuf,
}

impl Settings {
    /// Collects settings from parsed arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config_dir: cli.config_dir.clone(),
            wireguard_dir: cli.wireguard_dir.clone(),
            keygen: cli.keygen,
            wg_binary: cli.wg_binary.clone(),
            systemctl: cli.systemctl.clone(),
        }
    }

    /// Builds the configured key provider.
    #[must_use]
    pub fn key_provider(&self) -> Box<dyn KeyProvider> {
        match self.keygen {
            KeyBackend::Native => Box::new(NativeKeys),
            KeyBackend::Wg => Box::new(WgTool::new(&self.wg_binary)),
        }
    }

    /// Builds the service manager.
    #[must_use]
    pub fn service_manager(&self) -> Systemd {
        Systemd::new(&self.systemctl)
    }

    /// Path `iface sync` writes the config of `interface` to.
    #[must_use]
    pub fn sync_path(&self, interface: &str) -> PathBuf {
        self.wireguard_dir.join(format!("{interface}.conf"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn settings_from_flags() {
        let cli = Cli::parse_from([
            "wgup",
            "--config-dir",
            "/srv/wgup",
            "--wireguard-dir",
            "/srv/wg",
            "--keygen",
            "wg",
            "--wg-binary",
            "/usr/local/bin/wg",
            "version",
        ]);
        let settings = Settings::from_cli(&cli);
        assert_eq!(settings.config_dir, PathBuf::from("/srv/wgup"));
        assert_eq!(settings.keygen, KeyBackend::Wg);
        assert_eq!(settings.wg_binary, PathBuf::from("/usr/local/bin/wg"));
        assert_eq!(settings.sync_path("wg0"), PathBuf::from("/srv/wg/wg0.conf"));
    }

    #[test]
    fn native_provider_generates_keys() {
        let cli = Cli::parse_from(["wgup", "--keygen", "native", "version"]);
        let keys = Settings::from_cli(&cli).key_provider();
        let pair = keys.generate_key_pair().expect("native keys");
        assert_eq!(pair.public_key.len(), 44);
    }
}
