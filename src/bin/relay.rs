//! Relay client - joins a relay from the terminal
//!
//! Sends the handshake, then copies stdin lines to the server and server
//! lines to stdout until either side closes.
//!
//! # Usage
//!
//! ```bash
//! # Join as alice, reporting the local socket address
//! relay --name alice
//!
//! # Join a remote relay with an explicit reported address
//! relay --name bob --address 10.0.0.2 --server relay.example:8080
//! ```

use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use relay_protocol::{parse_handshake, ParsedHandshake, ROSTER_PREFIX};

/// Relay client - chat through a relay daemon
#[derive(Parser, Debug)]
#[command(name = "relay", version, about)]
struct Args {
    /// Display name shown to other peers
    #[arg(short, long)]
    name: String,

    /// Address to report in the roster (defaults to the local socket address)
    #[arg(short, long)]
    address: Option<String>,

    /// Relay daemon to connect to
    #[arg(short, long, default_value = "127.0.0.1:8080", env = "RELAY_SERVER")]
    server: String,

    /// Print roster lines instead of hiding them
    #[arg(long)]
    show_roster: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("relay=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let stream = TcpStream::connect(&args.server)
        .await
        .with_context(|| format!("Failed to connect to {}", args.server))?;
    let local = stream.local_addr().ok();
    info!(server = %args.server, "Connected");

    let handshake = build_handshake(&args, local)?;
    let (reader, mut writer) = stream.into_split();

    send_line(&mut writer, &handshake.to_string()).await?;
    run_client_loop(BufReader::new(reader), &mut writer, args.show_roster).await?;

    if let Err(e) = writer.shutdown().await {
        debug!(error = %e, "Failed to shut down writer cleanly");
    }
    Ok(())
}

/// Builds and validates the handshake line before anything is sent.
fn build_handshake(args: &Args, local: Option<SocketAddr>) -> Result<ParsedHandshake> {
    let address = match (&args.address, local) {
        (Some(address), _) => address.clone(),
        (None, Some(local)) => local.to_string(),
        (None, None) => bail!("No --address given and the local address is unknown"),
    };

    parse_handshake(&format!("{}|{}", args.name, address))
        .with_context(|| format!("Invalid name or address: {:?} / {:?}", args.name, address))
}

/// Multiplexes server lines, stdin lines and Ctrl-C.
async fn run_client_loop(
    mut reader: BufReader<OwnedReadHalf>,
    writer: &mut OwnedWriteHalf,
    show_roster: bool,
) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut server_line = String::new();
    let mut input = String::new();

    // Buffers are cleared only after a full line is handled: a read_line
    // that loses the select race keeps its partial data in the buffer.
    loop {
        tokio::select! {
            read = reader.read_line(&mut server_line) => {
                if read.context("Failed to read from relay")? == 0 {
                    println!("*** relay closed the connection");
                    return Ok(());
                }
                render_server_line(server_line.trim_end_matches(['\n', '\r']), show_roster);
                server_line.clear();
            }

            read = stdin.read_line(&mut input) => {
                if read.context("Failed to read stdin")? == 0 {
                    return Ok(());
                }
                send_line(writer, input.trim_end_matches(['\n', '\r'])).await?;
                input.clear();
            }

            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Ctrl-C handler failed");
                }
                return Ok(());
            }
        }
    }
}

fn render_server_line(line: &str, show_roster: bool) {
    match line.strip_prefix(ROSTER_PREFIX) {
        Some(peers) if show_roster => println!("*** online: {}", peers.replace(',', ", ")),
        Some(_) => {}
        None => println!("{line}"),
    }
}

async fn send_line(writer: &mut OwnedWriteHalf, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
