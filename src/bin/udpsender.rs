//! Sends each line typed on stdin as a UDP datagram.

use clap::Parser;
use httpfromtcp::{http, net};
use std::io::{self, BufRead, Write};
use std::net::UdpSocket;
use tracing::{debug, warn};

/// CLI arguments for `udpsender`.
#[derive(Debug, Parser)]
#[command(about = "Send stdin lines to a UDP peer")]
struct Args {
    /// Address to send datagrams to.
    #[arg(long, default_value_t = format!("localhost:{}", http::DEFAULT_PORT))]
    addr: String,
}

fn init_tracing() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn main() -> net::Result<()> {
    init_tracing();
    let args = Args::parse();

    let peer = net::resolve(args.addr.as_str())?;
    let local = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(local)?;
    socket.connect(peer)?;
    debug!(%peer, "sending datagrams");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print!(">");
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }

        print!("You entered: {}", line);
        if let Err(error) = socket.send(line.as_bytes()) {
            warn!(%peer, %error, "unable to send datagram");
        }
    }
}
