use core::error::Error;
use std::sync::Arc;

use log::{info, warn};
use shared::{
    envelope::Envelope,
    message_kind::MessageKind,
    payload::{
        ClientData, ClientId, CreateRoomRequest, CreateRoomResponse, JoinRoomRequest,
        JoinRoomResponse, NetworkData,
    },
};

use crate::{
    clients::ClientRegistry,
    rooms::{JoinError, RoomMember, RoomRegistry},
};

pub struct Dispatcher;

impl Dispatcher {
    /// Routes one decoded envelope from `sender_id`. Registry failures
    /// become structured failure responses on the sender's mailbox; unknown
    /// types and undecodable payloads are logged and dropped with no
    /// answer.
    pub async fn handle_envelope(
        envelope: Envelope,
        sender_id: ClientId,
        clients: &Arc<ClientRegistry>,
        rooms: &Arc<RoomRegistry>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let kind = match envelope.kind.parse::<MessageKind>() {
            Ok(kind) => kind,
            Err(_) => {
                warn!(
                    "Discarding message with unknown type {:?} from client {}",
                    envelope.kind, sender_id
                );
                return Ok(());
            }
        };

        match kind {
            MessageKind::CreateRoom => {
                let request: CreateRoomRequest = match serde_json::from_value(envelope.data) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!(
                            "Discarding malformed room/create payload from client {}: {}",
                            sender_id, e
                        );
                        return Ok(());
                    }
                };

                Self::create_room(request, sender_id, clients, rooms).await
            }

            MessageKind::JoinRoom => {
                let request: JoinRoomRequest = match serde_json::from_value(envelope.data) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!(
                            "Discarding malformed room/join payload from client {}: {}",
                            sender_id, e
                        );
                        return Ok(());
                    }
                };

                Self::join_room(request, sender_id, clients, rooms).await
            }

            _ => {
                warn!(
                    "Discarding server-only message type {} from client {}",
                    kind, sender_id
                );
                Ok(())
            }
        }
    }

    async fn create_room(
        request: CreateRoomRequest,
        sender_id: ClientId,
        clients: &Arc<ClientRegistry>,
        rooms: &Arc<RoomRegistry>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let host = RoomMember {
            client_id: sender_id,
            send_port: request.send_port,
            recv_port: request.recv_port,
        };

        let room_id = rooms.create(request.max_clients, host).await;

        info!("Client {} created room {}", sender_id, room_id);

        let response = Envelope::new(
            MessageKind::CreateRoomResponse,
            &CreateRoomResponse { room_id },
        )?;
        clients.deliver(sender_id, response).await;

        Ok(())
    }

    async fn join_room(
        request: JoinRoomRequest,
        sender_id: ClientId,
        clients: &Arc<ClientRegistry>,
        rooms: &Arc<RoomRegistry>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let member = RoomMember {
            client_id: sender_id,
            send_port: request.send_port,
            recv_port: request.recv_port,
        };

        let host = match rooms.join(&request.room_id, member).await {
            Ok(host) => host,
            Err(e) => {
                info!(
                    "Client {} could not join room {}: {}",
                    sender_id, request.room_id, e
                );
                return Self::reject_join(request.room_id, sender_id, e, clients).await;
            }
        };

        let host_addr = clients.lookup_addr(host.client_id).await;
        let joiner_addr = clients.lookup_addr(sender_id).await;

        let (Some((host_ip, _)), Some((joiner_ip, _))) = (host_addr, joiner_addr) else {
            // The host raced a disconnect between the membership insert and
            // this lookup; its eviction tears the room down.
            return Self::reject_join(request.room_id, sender_id, JoinError::RoomNotFound, clients)
                .await;
        };

        info!(
            "Client {} joined room {} hosted by client {}",
            sender_id, request.room_id, host.client_id
        );

        let response = Envelope::new(
            MessageKind::JoinRoomResponse,
            &JoinRoomResponse {
                success: true,
                room_id: request.room_id.clone(),
                msg: None,
                host_data: Some(ClientData {
                    client_id: host.client_id,
                    network_data: NetworkData {
                        ip: host_ip.to_string(),
                        send_port: host.send_port,
                        recv_port: host.recv_port,
                    },
                }),
            },
        )?;
        clients.deliver(sender_id, response).await;

        let notification = Envelope::new(
            MessageKind::JoinRoomNotification,
            &ClientData {
                client_id: sender_id,
                network_data: NetworkData {
                    ip: joiner_ip.to_string(),
                    send_port: member.send_port,
                    recv_port: member.recv_port,
                },
            },
        )?;
        clients.deliver(host.client_id, notification).await;

        Ok(())
    }

    async fn reject_join(
        room_id: String,
        sender_id: ClientId,
        error: JoinError,
        clients: &Arc<ClientRegistry>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let response = Envelope::new(
            MessageKind::JoinRoomResponse,
            &JoinRoomResponse {
                success: false,
                room_id,
                msg: Some(error.to_string()),
                host_data: None,
            },
        )?;
        clients.deliver(sender_id, response).await;

        Ok(())
    }
}
