use anyhow::{Context, bail};
use shared::{
    ROOM_ID_LENGTH, envelope::Envelope, is_valid_room_id, message_kind::MessageKind,
    payload::{
        ClientConnection, ClientId, CreateRoomRequest, CreateRoomResponse, JoinRoomNotification,
        JoinRoomRequest, JoinRoomResponse, LeaveRoomNotification,
    },
    received_envelope::ReceivedEnvelope,
};
use tokio::net::TcpStream;

pub struct Client {
    stream: TcpStream,
    client_id: ClientId,
}

impl Client {
    pub async fn host(
        addr: &str,
        max_clients: u32,
        send_port: u16,
        recv_port: u16,
    ) -> anyhow::Result<()> {
        let mut client = Self::connect(addr).await?;

        let request = Envelope::new(
            MessageKind::CreateRoom,
            &CreateRoomRequest {
                max_clients,
                send_port,
                recv_port,
            },
        )?;
        request.write_to_stream(&mut client.stream).await?;

        let response = client.expect(MessageKind::CreateRoomResponse).await?;
        let response: CreateRoomResponse = serde_json::from_value(response.data)?;

        println!("Created room {} as client {}", response.room_id, client.client_id);
        println!("Waiting for peers...");

        client.watch_notifications().await
    }

    pub async fn join(
        addr: &str,
        room_id: &str,
        send_port: u16,
        recv_port: u16,
    ) -> anyhow::Result<()> {
        if !is_valid_room_id(room_id) {
            bail!(
                "Invalid room id {:?}: expected {} ASCII letters",
                room_id,
                ROOM_ID_LENGTH
            );
        }

        let mut client = Self::connect(addr).await?;

        let request = Envelope::new(
            MessageKind::JoinRoom,
            &JoinRoomRequest {
                room_id: room_id.to_string(),
                send_port,
                recv_port,
            },
        )?;
        request.write_to_stream(&mut client.stream).await?;

        let response = client.expect(MessageKind::JoinRoomResponse).await?;
        let response: JoinRoomResponse = serde_json::from_value(response.data)?;

        if !response.success {
            bail!(
                "Could not join room {}: {}",
                response.room_id,
                response.msg.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        let host_data = match response.host_data {
            Some(host_data) => host_data,
            None => bail!("Server reported success without host data"),
        };

        println!("Joined room {} as client {}", response.room_id, client.client_id);
        println!(
            "Host is client {} at {} (send {}, recv {})",
            host_data.client_id,
            host_data.network_data.ip,
            host_data.network_data.send_port,
            host_data.network_data.recv_port
        );

        client.watch_notifications().await
    }

    async fn connect(addr: &str) -> anyhow::Result<Self> {
        let mut stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to rendezvous server at {}", addr))?;

        let envelope = next_envelope(&mut stream).await?;

        if envelope.kind.parse::<MessageKind>() != Ok(MessageKind::ClientConnection) {
            bail!("Expected client/connection from server, got {}", envelope.kind);
        }

        let connection: ClientConnection = serde_json::from_value(envelope.data)?;

        println!("Registered with rendezvous server as client {}", connection.client_id);

        Ok(Self {
            stream,
            client_id: connection.client_id,
        })
    }

    async fn expect(&mut self, kind: MessageKind) -> anyhow::Result<Envelope> {
        let envelope = next_envelope(&mut self.stream).await?;

        if envelope.kind.parse::<MessageKind>() != Ok(kind) {
            bail!("Expected {} from server, got {}", kind, envelope.kind);
        }

        Ok(envelope)
    }

    /// Prints room membership changes until the server goes away.
    async fn watch_notifications(mut self) -> anyhow::Result<()> {
        loop {
            let envelope = match Envelope::read_from_stream(&mut self.stream).await? {
                ReceivedEnvelope::Eof => {
                    println!("Server closed the connection");
                    return Ok(());
                }
                ReceivedEnvelope::Envelope(envelope) => envelope,
            };

            match envelope.kind.parse::<MessageKind>() {
                Ok(MessageKind::JoinRoomNotification) => {
                    let peer: JoinRoomNotification = serde_json::from_value(envelope.data)?;
                    println!(
                        "Peer {} joined from {} (send {}, recv {})",
                        peer.client_id,
                        peer.network_data.ip,
                        peer.network_data.send_port,
                        peer.network_data.recv_port
                    );
                }
                Ok(MessageKind::LeaveRoomNotification) => {
                    let leave: LeaveRoomNotification = serde_json::from_value(envelope.data)?;
                    println!("Peer {} left room {}", leave.client_id, leave.room_id);
                }
                _ => println!("Received unknown message type {}", envelope.kind),
            }
        }
    }
}

async fn next_envelope(stream: &mut TcpStream) -> anyhow::Result<Envelope> {
    match Envelope::read_from_stream(stream).await? {
        ReceivedEnvelope::Eof => bail!("Server closed the connection"),
        ReceivedEnvelope::Envelope(envelope) => Ok(envelope),
    }
}
