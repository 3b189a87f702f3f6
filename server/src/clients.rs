use std::{collections::HashMap, net::IpAddr};

use log::debug;
use rand::Rng;
use shared::{envelope::Envelope, payload::ClientId};
use tokio::sync::{
    RwLock,
    mpsc::{self, UnboundedReceiver, UnboundedSender},
};

/// A registered client: the transport-observed address it connected from
/// and the mailbox feeding its writer task.
pub struct Client {
    pub id: ClientId,
    pub ip: IpAddr,
    pub port: u16,
    mailbox: UnboundedSender<Envelope>,
}

pub struct ClientRegistry {
    clients: RwLock<HashMap<ClientId, Client>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new client, returning its id and the receiving end of
    /// its mailbox. The id is a random draw, redrawn on collision; drawing
    /// and inserting happen under one write lock so concurrent
    /// registrations can never claim the same id.
    pub async fn register(&self, ip: IpAddr, port: u16) -> (ClientId, UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut clients = self.clients.write().await;
        let mut rng = rand::rng();

        let mut id: ClientId = rng.random();
        while clients.contains_key(&id) {
            id = rng.random();
        }

        clients.insert(
            id,
            Client {
                id,
                ip,
                port,
                mailbox: tx,
            },
        );

        (id, rx)
    }

    pub async fn lookup_addr(&self, id: ClientId) -> Option<(IpAddr, u16)> {
        self.clients.read().await.get(&id).map(|c| (c.ip, c.port))
    }

    /// Queues an envelope on the target client's mailbox. Never blocks on
    /// the receiver's socket; returns false if the client is gone.
    pub async fn deliver(&self, id: ClientId, envelope: Envelope) -> bool {
        match self.clients.read().await.get(&id) {
            Some(client) => client.mailbox.send(envelope).is_ok(),
            None => {
                debug!("Dropping delivery to unknown client {}", id);
                false
            }
        }
    }

    pub async fn remove(&self, id: ClientId) -> Option<Client> {
        self.clients.write().await.remove(&id)
    }
}
