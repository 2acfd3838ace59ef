//! One-shot specifier classification.
//!
//! Prints a single response line for the given specifier, in the same
//! envelope the daemon would use.

use clap::Parser;
use clap::error::ErrorKind;
use specsrv::config::Envelope;
use specsrv::protocol::encode_response;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// Classify one dependency specifier
#[derive(Parser, Debug)]
#[command(name = "spec-classify", version)]
struct Args {
    /// Raw specifier, e.g. "^1.2.3" or "npm:bar@latest"
    spec: String,

    /// Response envelope
    #[arg(long, value_enum, default_value_t = Envelope::Result)]
    envelope: Envelope,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            println!("{}", e);
            std::process::exit(1);
        }
    };

    let outcome = specsrv::npm_classifier().classify(&args.spec);
    let code = match &outcome {
        Err(e) if !e.is_invalid() => 1,
        _ => 0,
    };

    let line = match encode_response(&outcome, args.envelope) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!("failed to encode response: {}", e);
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = stdout.write_all(line.as_bytes()).and_then(|()| stdout.flush()) {
        tracing::error!("failed to write response: {}", e);
        std::process::exit(1);
    }
    std::process::exit(code);
}
