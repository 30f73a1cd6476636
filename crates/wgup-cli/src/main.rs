//! wgup binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use wgup_cli::cli::{Cli, Commands};
use wgup_cli::commands::{IfaceCommand, NatCommand, PeerCommand, VersionCommand};
use wgup_cli::{CliError, Context, OutputFormat, Settings};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();
    let mut stdin = io::stdin().lock();
    let mut ctx = Context::new(Settings::from_cli(&cli));

    match cli.command {
        Commands::Iface { command } => {
            IfaceCommand::new(&mut ctx).execute(&mut stdout, &mut stdin, &format, &command)?;
        }
        Commands::Peer { command } => {
            PeerCommand::new(&mut ctx).execute(&mut stdout, &mut stdin, &format, &command)?;
        }
        Commands::Nat { command } => {
            NatCommand::new(&mut ctx).execute(&mut stdout, &format, &command)?;
        }
        Commands::Version => {
            VersionCommand::new().execute(&mut stdout, &format)?;
        }
    }

    Ok(())
}
