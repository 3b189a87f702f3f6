mod client;

use clap::{Parser, Subcommand};
use shared::{DEFAULT_HOST, DEFAULT_PORT};

use crate::client::Client;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address of the rendezvous server
    #[arg(short, long, default_value = DEFAULT_HOST)]
    server: String,

    /// Port of the rendezvous server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Create a room and wait for peers to join
    Host {
        #[arg(long, default_value_t = 2)]
        max_clients: u32,

        /// Port this peer advertises for outgoing peer traffic
        #[arg(long)]
        send_port: u16,

        /// Port this peer advertises for incoming peer traffic
        #[arg(long)]
        recv_port: u16,
    },

    /// Join an existing room by id
    Join {
        room_id: String,

        #[arg(long)]
        send_port: u16,

        #[arg(long)]
        recv_port: u16,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let addr = format!("{}:{}", args.server, args.port);

    let result = match args.mode {
        Mode::Host {
            max_clients,
            send_port,
            recv_port,
        } => Client::host(&addr, max_clients, send_port, recv_port).await,
        Mode::Join {
            room_id,
            send_port,
            recv_port,
        } => Client::join(&addr, &room_id, send_port, recv_port).await,
    };

    if let Err(e) = result {
        eprintln!("{}", e);
    }
}
