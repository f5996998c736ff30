//! Accepts TCP connections and prints the request parsed from each one.
//!
//! A request without `content-length` is only complete once the client
//! half-closes its side, e.g. `printf 'GET / HTTP/1.1\r\n\r\n' | nc -N 127.0.0.1 42069`.
//!
//! Run with: RUST_LOG=debug cargo run --bin tcplistener -- --addr 127.0.0.1:42069

use clap::Parser;
use httpfromtcp::http::session::FdSessionOps;
use httpfromtcp::http::{self, HttpServer, ParserConfig, Request};
use httpfromtcp::net::{self, Listener};
use std::time::Duration;
use tracing::{info, warn};

/// CLI arguments for `tcplistener`.
#[derive(Debug, Parser)]
#[command(about = "Parse one HTTP/1.1 request per TCP connection and print it")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value_t = format!("127.0.0.1:{}", http::DEFAULT_PORT))]
    addr: String,

    /// Bytes requested per read.
    #[arg(long, default_value_t = http::parser::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Seconds to wait for each read before giving up on a connection; 0 waits forever.
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

fn init_tracing() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

fn print_request(request: &Request) {
    println!("Request line:");
    println!("- Method: {}", request.method());
    println!("- Target: {}", request.target());
    println!("- Version: {}", request.http_version());

    println!("Headers:");
    for (name, value) in request.headers().iter() {
        println!("- {}: {}", name, value);
    }

    println!("Body:");
    println!("{}", String::from_utf8_lossy(request.body()));
}

fn main() -> http::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = ParserConfig::new().chunk_size(args.chunk_size);
    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));

    let listener = Listener::bind(net::resolve(args.addr.as_str())?)?;

    loop {
        let (stream, peer) = listener.accept()?;
        info!(%peer, "accepted connection");

        let mut server = HttpServer::with_config(FdSessionOps::new(stream), config);
        server.set_timeout(timeout);

        match server.receive_request() {
            Ok(request) => print_request(&request),
            Err(error) => warn!(%peer, %error, "failed to parse request"),
        }

        if let Err(error) = server.close() {
            warn!(%peer, %error, "failed to close connection");
        }
        info!(%peer, "connection closed");
    }
}
