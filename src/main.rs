use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::io::{self, IsTerminal};
use tracing_subscriber::EnvFilter;
use tripflow::interfaces::cli::{self, Cli};

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tripflow=info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let args = Cli::parse();

    let store = cli::open_store(args.db_path.as_deref()).into_diagnostic()?;

    let stdout = io::stdout();
    cli::run(args.command, store, &mut stdout.lock()).into_diagnostic()?;

    Ok(())
}
