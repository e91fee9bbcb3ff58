//! # Inventario Forwarder
//!
//! ```text
//! inventario-forwarder --server 192.168.1.10 --port COM3
//! inventario-forwarder --auto --filter "USB"
//! ```
//!
//! Without `--server` the address is resolved (see [`resolve`]). Without
//! `--port`, `--auto` detects the scanner for up to 10 seconds.

mod error;
mod forward;
mod push;
mod resolve;

use std::sync::Arc;

use clap::Parser;
use inventario_scanner::{DtrMode, PortSettings, SystemSerial, DEFAULT_BAUD};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::{ForwarderError, ForwarderResult};
use crate::forward::{detect_port, Forwarder, DETECT_TIMEOUT};
use crate::push::Pusher;
use crate::resolve::{ServerResolver, DEFAULT_HTTP_PORT};

#[derive(Debug, Parser)]
#[command(name = "inventario-forwarder", version, about = "Forwards serial barcode scans to an Inventario server")]
struct Args {
    /// Server IP or hostname (no http://); resolved automatically when omitted
    #[arg(long)]
    server: Option<String>,

    /// Server HTTP port
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    server_port: u16,

    /// Serial port name (COM3, /dev/ttyUSB0); requires --auto when omitted
    #[arg(long)]
    port: Option<String>,

    #[arg(long, default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// Detect the scanner port automatically
    #[arg(long)]
    auto: bool,

    /// Prefer ports whose description, hardware id or name contains this text
    #[arg(long)]
    filter: Option<String>,

    /// Reconnect attempts before exiting (-1 for infinite)
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    retries: i64,

    /// DTR line control: `off` keeps some scanners from powering down on open
    #[arg(long, default_value_t = DtrMode::Auto)]
    dtr: DtrMode,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,inventario=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    tokio::select! {
        result = run(args) => {
            if let Err(e) = result {
                error!(error = %e, "Forwarder stopped");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }
}

async fn run(args: Args) -> ForwarderResult<()> {
    let server = match args.server {
        Some(server) => server,
        None => {
            info!("Resolving server...");
            let resolver = ServerResolver {
                http_port: args.server_port,
                ..ServerResolver::default()
            };
            resolver.resolve().await?.to_string()
        }
    };
    let pusher = Pusher::new(&server, args.server_port)?;
    info!(url = %pusher.url(), "Server ready");

    let backend = Arc::new(SystemSerial);
    let port = match args.port {
        Some(port) => port,
        None if args.auto => {
            info!("Detecting scanner port...");
            detect_port(backend.as_ref(), args.filter.as_deref(), DETECT_TIMEOUT)
                .await
                .ok_or(ForwarderError::NoPort)?
        }
        None => return Err(ForwarderError::NoPort),
    };

    let settings = PortSettings {
        baud: args.baud,
        dtr: args.dtr,
        ..PortSettings::default()
    };

    Forwarder::new(backend, settings, pusher)
        .auto_detect(args.auto, args.filter)
        .retries(args.retries)
        .run(port)
        .await
}
