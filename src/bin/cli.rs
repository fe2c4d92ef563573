//! RelayKV CLI Client
//!
//! Command-line interface for interacting with RelayKV.

use std::io::Write;
use std::net::TcpStream;
use std::process;

use clap::{Parser, Subcommand};
use relaykv::protocol::{Command, FrameBuffer, ProtocolValue};

/// RelayKV CLI
#[derive(Parser, Debug)]
#[command(name = "relaykv-cli")]
#[command(about = "CLI for the RelayKV key-value server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping,

    /// Echo a message back
    Echo {
        message: String,
    },

    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Expire the key after this many milliseconds
        #[arg(long)]
        px: Option<u64>,
    },

    /// Show replication info
    Info,
}

impl Commands {
    fn to_command(&self) -> Command {
        match self {
            Commands::Ping => Command::new("PING", Vec::<String>::new()),
            Commands::Echo { message } => Command::new("ECHO", [message.as_str()]),
            Commands::Get { key } => Command::new("GET", [key.as_str()]),
            Commands::Set { key, value, px } => {
                let mut args = vec![key.clone(), value.clone()];
                if let Some(ms) = px {
                    args.push("PX".to_string());
                    args.push(ms.to_string());
                }
                Command::new("SET", args)
            }
            Commands::Info => Command::new("INFO", ["replication"]),
        }
    }
}

fn main() {
    let args = Args::parse();

    match send(&args.server, &args.command.to_command()) {
        Ok(reply) => {
            println!("{}", reply);
            if matches!(reply, ProtocolValue::Error(_)) {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn send(server: &str, command: &Command) -> relaykv::Result<ProtocolValue> {
    let mut stream = TcpStream::connect(server)?;
    stream.write_all(&command.encode())?;
    stream.flush()?;

    let mut buffer = FrameBuffer::new();
    buffer.read_frame(&mut stream)?.ok_or_else(|| {
        relaykv::RelayError::Network("server closed the connection without replying".to_string())
    })
}
