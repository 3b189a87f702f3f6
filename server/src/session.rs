use core::error::Error;
use std::{net::SocketAddr, sync::Arc, time::Duration};

use log::{info, warn};
use shared::{
    envelope::Envelope,
    error::ProtocolError,
    message_kind::MessageKind,
    payload::{ClientConnection, ClientId},
    received_envelope::ReceivedEnvelope,
};
use tokio::{io::AsyncWriteExt, net::TcpStream, time::timeout};

use crate::{clients::ClientRegistry, dispatcher::Dispatcher, rooms::RoomRegistry};

const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

pub struct Session;

impl Session {
    /// Drives one accepted connection: registers the client, announces its
    /// id, then runs the framed reader loop here while a spawned writer
    /// task drains the client's mailbox. Returns once the peer disconnects,
    /// errors, or idles out; the caller owns eviction.
    pub async fn handle_stream(
        stream: TcpStream,
        peer_addr: SocketAddr,
        registered_id: &mut Option<ClientId>,
        clients: Arc<ClientRegistry>,
        rooms: Arc<RoomRegistry>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let (mut reader, mut writer) = stream.into_split();

        let (client_id, mut mailbox_rx) = clients.register(peer_addr.ip(), peer_addr.port()).await;
        *registered_id = Some(client_id);

        info!("Client {} connected from {}", client_id, peer_addr);

        let hello = Envelope::new(MessageKind::ClientConnection, &ClientConnection { client_id })?;
        clients.deliver(client_id, hello).await;

        // Sole consumer of the mailbox. Exits when every sender is gone
        // (eviction drops the registry's copy) or the peer stops reading.
        tokio::spawn(async move {
            while let Some(envelope) = mailbox_rx.recv().await {
                if let Err(e) = envelope.write_to_stream(&mut writer).await {
                    warn!("Stopping writer for client {}: {}", client_id, e);
                    break;
                }
            }

            let _ = writer.shutdown().await;
        });

        loop {
            let received =
                match timeout(IDLE_TIMEOUT, Envelope::read_from_stream(&mut reader)).await {
                    Ok(received) => received,
                    Err(_) => {
                        info!(
                            "Client {} idle for {:?}, disconnecting",
                            client_id, IDLE_TIMEOUT
                        );
                        return Ok(());
                    }
                };

            let envelope = match received {
                Ok(ReceivedEnvelope::Envelope(envelope)) => envelope,
                Ok(ReceivedEnvelope::Eof) => return Ok(()),
                Err(ProtocolError::Json(e)) => {
                    // The length prefix already consumed the bad frame, so
                    // the stream is still in sync.
                    warn!("Discarding malformed frame from client {}: {}", client_id, e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            Dispatcher::handle_envelope(envelope, client_id, &clients, &rooms).await?;
        }
    }
}
