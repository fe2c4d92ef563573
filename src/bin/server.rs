//! RelayKV Server Binary
//!
//! Starts the TCP server for RelayKV.

use clap::Parser;
use relaykv::{Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// RelayKV Server
#[derive(Parser, Debug)]
#[command(name = "relaykv-server")]
#[command(about = "In-memory RESP key-value server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "6379")]
    port: u16,

    /// Interface to bind
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Run as a replica of the given master ("<host> <port>")
    #[arg(long, value_name = "HOST PORT")]
    replicaof: Option<String>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Per-step timeout of the replica handshake in milliseconds
    #[arg(long, default_value = "2000")]
    handshake_timeout_ms: u64,

    /// Purge expired keys in the background every N milliseconds
    #[arg(long)]
    sweep_interval_ms: Option<u64>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,relaykv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RelayKV Server v{}", relaykv::VERSION);

    // Build config from args
    let mut builder = Config::builder()
        .listen_addr(format!("{}:{}", args.bind, args.port))
        .max_connections(args.max_connections)
        .handshake_timeout_ms(args.handshake_timeout_ms);

    if let Some(ms) = args.sweep_interval_ms {
        builder = builder.sweep_interval_ms(ms);
    }

    if let Some(spec) = &args.replicaof {
        match parse_replicaof(spec) {
            Some((host, port)) => {
                tracing::info!("Replica of {}:{}", host, port);
                builder = builder.replica_of(host, port);
            }
            None => {
                tracing::error!("Invalid --replicaof '{}': expected \"<host> <port>\"", spec);
                std::process::exit(1);
            }
        }
    }

    let config = builder.build();

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Accepts "host port" as well as "host:port"
fn parse_replicaof(spec: &str) -> Option<(String, u16)> {
    let (host, port) = match spec.split_once(char::is_whitespace) {
        Some(parts) => parts,
        None => spec.rsplit_once(':')?,
    };
    let host = host.trim();
    if host.is_empty() {
        return None;
    }
    let port = port.trim().parse().ok()?;
    Some((host.to_string(), port))
}
