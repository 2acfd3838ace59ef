//! specsrv daemon
//!
//! Serves specifier classification on a Unix socket for as long as the
//! peer process lives.
//!
//! # Usage
//!
//! ```bash
//! specsrv /tmp/specsrv.sock 4242
//! specsrv /tmp/specsrv.sock 4242 --framing chunk --envelope legacy
//! ```

use clap::Parser;
use clap::error::ErrorKind;
use specsrv::config::{Envelope, Framing, ServerConfig};
use specsrv::server::SpecServer;
use specsrv::shutdown::{ShutdownToken, listen_for_signals};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Dependency specifier classification daemon
#[derive(Parser, Debug)]
#[command(name = "specsrv", version)]
struct Args {
    /// Unix socket to listen on
    socket_path: PathBuf,

    /// Process whose exit stops the server
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    peer_pid: u32,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request framing, overrides the config file
    #[arg(long, value_enum)]
    framing: Option<Framing>,

    /// Response envelope, overrides the config file
    #[arg(long, value_enum)]
    envelope: Option<Envelope>,

    /// Peer check period in milliseconds, overrides the config file
    #[arg(long)]
    liveness_interval_ms: Option<u64>,
}

impl Args {
    fn server_config(&self) -> specsrv::Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        if let Some(framing) = self.framing {
            config.framing = framing;
        }
        if let Some(envelope) = self.envelope {
            config.envelope = envelope;
        }
        if let Some(ms) = self.liveness_interval_ms {
            config.liveness_interval_ms = ms;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
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

    let config = match args.server_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "starting");

    let token = ShutdownToken::new();
    tokio::spawn(listen_for_signals(token.clone()));

    let server = SpecServer::new(specsrv::npm_classifier(), &args.socket_path, config)
        .with_peer(args.peer_pid)
        .with_shutdown_token(token);

    match server.run().await {
        Ok(reason) => std::process::exit(reason.exit_code()),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}
