use serde::{Deserialize, Serialize};

pub type ClientId = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConnection {
    pub client_id: ClientId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub max_clients: u32,
    pub send_port: u16,
    pub recv_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub room_id: String,
    pub send_port: u16,
    pub recv_port: u16,
}

/// The endpoint a client advertises for direct peer-to-peer traffic,
/// distinct from the transport-observed address of its connection to us.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkData {
    pub ip: String,
    pub send_port: u16,
    pub recv_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientData {
    pub client_id: ClientId,
    pub network_data: NetworkData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub success: bool,
    pub room_id: String,
    pub msg: Option<String>,
    pub host_data: Option<ClientData>,
}

pub type JoinRoomNotification = ClientData;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRoomNotification {
    pub client_id: ClientId,
    pub room_id: String,
}
