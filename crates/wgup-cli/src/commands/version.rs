//! Version command.

use std::io::Write;

use crate::error::CliError;
use crate::output::{OutputFormat, VersionInfo};

/// Version command executor.
#[derive(Debug, Default)]
pub struct VersionCommand;

impl VersionCommand {
    /// Create a new version command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Print the program version and the config schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn execute<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        format.write(writer, &Self::info())
    }

    /// The version of this build.
    #[must_use]
    pub const fn info() -> VersionInfo {
        VersionInfo {
            program: "wgup",
            version: env!("CARGO_PKG_VERSION"),
            config_version: wgup_core::CONFIG_VERSION,
        }
    }
}
