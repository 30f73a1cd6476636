//! `wg-quick` service control.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::CliError;

/// Starts, stops and reloads the tunnel of an interface.
pub trait ServiceManager {
    /// Enables the tunnel at boot and (re)starts it now.
    fn up(&self, interface: &str) -> Result<(), CliError>;

    /// Disables the tunnel at boot and stops it now.
    fn down(&self, interface: &str) -> Result<(), CliError>;

    /// Reloads the running tunnel.
    fn reload(&self, interface: &str) -> Result<(), CliError>;
}

/// Controls `wg-quick@<interface>` units through `systemctl`.
#[derive(Debug, Clone)]
pub struct Systemd {
    systemctl: PathBuf,
}

impl Systemd {
    /// Creates a manager running the given `systemctl` binary.
    #[must_use]
    pub fn new(systemctl: impl AsRef<Path>) -> Self {
        Self {
            systemctl: systemctl.as_ref().to_path_buf(),
        }
    }

    /// Unit name of an interface's tunnel.
    #[must_use]
    pub fn unit(interface: &str) -> String {
        format!("wg-quick@{interface}")
    }

    fn run(&self, action: &str, interface: &str) -> Result<(), CliError> {
        let unit = Self::unit(interface);
        let command = format!("{} {action} {unit}", self.systemctl.display());
        debug!(command = %command, "running service command");

        let status = Command::new(&self.systemctl)
            .arg(action)
            .arg(&unit)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| CliError::Service {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(CliError::Service {
                command,
                message: status.to_string(),
            });
        }
        Ok(())
    }
}

impl ServiceManager for Systemd {
    fn up(&self, interface: &str) -> Result<(), CliError> {
        self.run("enable", interface)?;
        self.run("restart", interface)?;
        info!(interface = %interface, "tunnel up");
        Ok(())
    }

    fn down(&self, interface: &str) -> Result<(), CliError> {
        self.run("disable", interface)?;
        self.run("stop", interface)?;
        info!(interface = %interface, "tunnel down");
        Ok(())
    }

    fn reload(&self, interface: &str) -> Result<(), CliError> {
        self.run("reload", interface)?;
        info!(interface = %interface, "tunnel reloaded");
        Ok(())
    }
}
