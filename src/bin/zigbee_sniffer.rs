//! Prints a one-line summary of every IEEE 802.15.4 frame the Zigbee RX
//! chain forwards over UDP.

use std::net::UdpSocket;

use chrono::Local;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use multitrx_monitor::ieee802154::parse_frame;

/// Zigbee frame sniffer for the testbed's decoded-frame UDP feed.
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// Address to listen on
    #[clap(short, long, default_value = "127.0.0.1:55557")]
    listen: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let socket = UdpSocket::bind(&args.listen)?;
    info!("listening on {}", args.listen);

    let mut buf = [0u8; 2048];
    loop {
        let (len, addr) = socket.recv_from(&mut buf)?;
        match parse_frame(&buf[..len]) {
            Ok(summary) => println!("{} {summary}", Local::now().format("%H:%M:%S%.3f")),
            Err(e) => debug!("unparseable frame from {addr}: {e}"),
        }
    }
}
