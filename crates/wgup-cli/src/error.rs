//! CLI error types.

use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Error from the configuration model or store.
    #[error(transparent)]
    Core(#[from] wgup_core::Error),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// A service control command failed.
    #[error("`{command}` failed: {message}")]
    Service {
        /// Command line that was run.
        command: String,
        /// Exit status or spawn error.
        message: String,
    },

    /// The user declined a confirmation prompt.
    #[error("operation cancelled by user, no action taken")]
    Cancelled,

    /// IO error on the terminal streams.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_display_unchanged() {
        let err = CliError::from(wgup_core::Error::InterfaceNotFound("wg0".into()));
        assert_eq!(err.to_string(), "interface \"wg0\" does not exist");
    }

    #[test]
    fn service_error_display() {
        let err = CliError::Service {
            command: "systemctl restart wg-quick@wg0".into(),
            message: "exit status: 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "`systemctl restart wg-quick@wg0` failed: exit status: 1"
        );
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        assert!(matches!(CliError::from(io_err), CliError::Io(_)));
    }
}
