mod clients;
mod dispatcher;
mod rooms;
mod server;
mod session;
#[cfg(test)]
mod tests;

use log::{error, info};
use shared::{DEFAULT_HOST, DEFAULT_PORT};

use clap::Parser;

use crate::server::RendezvousServer;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Source address for the listening socket
    #[arg(short = 's', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port for the server to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = format!("{}:{}", args.host, args.port);

    let server = match RendezvousServer::bind(&addr).await {
        Ok(server) => server,
        Err(e) => {
            error!("Error binding {}: {}", addr, e);
            return;
        }
    };

    info!("Rendezvous server listening on {}", addr);

    match server.listen().await {
        Ok(_) => (),
        Err(e) => {
            error!("{}", e);
        }
    };
}
