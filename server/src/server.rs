use core::error::Error;
use std::{net::SocketAddr, sync::Arc};

use log::{error, info};
use shared::{
    envelope::Envelope,
    message_kind::MessageKind,
    payload::{ClientId, LeaveRoomNotification},
};
use tokio::net::TcpListener;

use crate::{clients::ClientRegistry, rooms::RoomRegistry, session::Session};

pub struct RendezvousServer {
    listener: TcpListener,
    clients: Arc<ClientRegistry>,
    rooms: Arc<RoomRegistry>,
}

impl RendezvousServer {
    pub async fn bind(addr: &str) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            clients: Arc::new(ClientRegistry::new()),
            rooms: Arc::new(RoomRegistry::new()),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn listen(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        loop {
            let (stream, peer_addr) = self.listener.accept().await?;

            let clients = self.clients.clone();
            let rooms = self.rooms.clone();

            tokio::spawn(async move {
                let mut registered_id = None;

                if let Err(e) = Session::handle_stream(
                    stream,
                    peer_addr,
                    &mut registered_id,
                    clients.clone(),
                    rooms.clone(),
                )
                .await
                {
                    error!("Error handling connection from {}: {}", peer_addr, e);
                }

                if let Some(client_id) = registered_id.take() {
                    Self::evict(client_id, &clients, &rooms).await;
                    info!("Client {} disconnected", client_id);
                }
            });
        }
    }

    /// Removes a disconnected client from both registries and tells its
    /// former room peers. A room whose host left is already gone by the
    /// time the notifications go out, so a racing join sees "Room not
    /// found".
    async fn evict(client_id: ClientId, clients: &Arc<ClientRegistry>, rooms: &Arc<RoomRegistry>) {
        clients.remove(client_id).await;

        for eviction in rooms.evict(client_id).await {
            if eviction.closed {
                info!("Room {} closed, host {} left", eviction.room_id, client_id);
            }

            let notification = match Envelope::new(
                MessageKind::LeaveRoomNotification,
                &LeaveRoomNotification {
                    client_id,
                    room_id: eviction.room_id,
                },
            ) {
                Ok(notification) => notification,
                Err(e) => {
                    error!("Failed to encode leave notification: {}", e);
                    continue;
                }
            };

            for peer_id in eviction.notify {
                clients.deliver(peer_id, notification.clone()).await;
            }
        }
    }
}
