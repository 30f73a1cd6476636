//! Command implementations.
//!
//! Each handler wraps the [`Context`](crate::context::Context) and runs one
//! subcommand group.

mod iface;
mod nat;
mod peer;
mod version;

use std::io::{BufRead, Write};
use std::path::Path;

pub use iface::IfaceCommand;
pub use nat::NatCommand;
pub use peer::PeerCommand;
pub use version::VersionCommand;

use crate::error::CliError;
use crate::output::{Message, OutputFormat};

/// Asks a y/N question. Anything but `y` declines.
pub(crate) fn confirm<W: Write, R: BufRead>(
    writer: &mut W,
    input: &mut R,
    question: &str,
) -> Result<bool, CliError> {
    writeln!(writer, "{question}")?;
    writeln!(writer, "This operation is irreversible!")?;
    write!(writer, "-> (y/N): ")?;
    writer.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Writes a rendered config to `file`, or verbatim to `writer` when no file
/// is given.
pub(crate) fn write_config<W: Write>(
    writer: &mut W,
    format: &OutputFormat,
    file: Option<&Path>,
    config: &str,
) -> Result<(), CliError> {
    match file {
        Some(path) => {
            wgup_core::store::write_atomic(path, config.as_bytes())?;
            format.write(writer, &Message::success(format!("Wrote {}", path.display())))?;
        }
        None => writer.write_all(config.as_bytes())?,
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    #[test]
    fn confirm_accepts_only_y() {
        for (answer, expected) in [("y\n", true), ("Y\n", true), ("yes\n", false), ("\n", false)] {
            let mut out = Vec::new();
            let confirmed =
                confirm(&mut out, &mut answer.as_bytes(), "Remove it?").expect("confirm");
            assert_eq!(confirmed, expected, "answer {answer:?}");
        }
    }

    #[test]
    fn confirm_prints_prompt() {
        let mut out = Vec::new();
        confirm(&mut out, &mut "n\n".as_bytes(), "Remove it?").expect("confirm");
        let prompt = String::from_utf8(out).expect("utf-8");
        assert_eq!(prompt, "Remove it?\nThis operation is irreversible!\n-> (y/N): ");
    }

    #[test]
    fn confirm_treats_eof_as_no() {
        let mut out = Vec::new();
        assert!(!confirm(&mut out, &mut "".as_bytes(), "Remove it?").expect("confirm"));
    }

    #[test]
    fn config_goes_to_stdout_without_file() {
        let mut out = Vec::new();
        write_config(&mut out, &OutputFormat::default(), None, "[Interface]\n").expect("write");
        assert_eq!(out, b"[Interface]\n");
    }

    #[test]
    fn config_goes_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("wg0.conf");
        let mut out = Vec::new();
        write_config(
            &mut out,
            &OutputFormat::new(Format::Table),
            Some(&path),
            "[Interface]\n",
        )
        .expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "[Interface]\n");
        assert!(String::from_utf8(out).expect("utf-8").contains("Wrote"));
    }
}
