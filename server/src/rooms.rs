use std::collections::HashMap;

use rand::Rng;
use shared::{ROOM_ID_CHARS, ROOM_ID_LENGTH, payload::ClientId};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,
}

/// A room member's advertised peer-to-peer endpoint ports. The ip half of
/// the endpoint comes from the client registry at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomMember {
    pub client_id: ClientId,
    pub send_port: u16,
    pub recv_port: u16,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub max_clients: u32,
    pub host_id: ClientId,
    pub members: HashMap<ClientId, RoomMember>,
}

/// What evicting a client changed in one room: whether the room itself was
/// removed (the host left) and which members still need to hear about it.
pub struct Eviction {
    pub room_id: String,
    pub closed: bool,
    pub notify: Vec<ClientId>,
}

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a room with the host as sole member and returns its id: six
    /// random ASCII letters, redrawn on collision under the same write lock
    /// that inserts the room. `max_clients` is clamped to at least 1 so the
    /// host itself always fits.
    pub async fn create(&self, max_clients: u32, host: RoomMember) -> String {
        let mut rooms = self.rooms.write().await;

        let mut id = generate_room_id();
        while rooms.contains_key(&id) {
            id = generate_room_id();
        }

        rooms.insert(
            id.clone(),
            Room {
                id: id.clone(),
                max_clients: max_clients.max(1),
                host_id: host.client_id,
                members: HashMap::from([(host.client_id, host)]),
            },
        );

        id
    }

    /// Adds `member` to the room and returns the host's member record.
    /// Fails without mutating anything if the room is unknown or already at
    /// capacity.
    pub async fn join(&self, room_id: &str, member: RoomMember) -> Result<RoomMember, JoinError> {
        let mut rooms = self.rooms.write().await;

        let room = rooms.get_mut(room_id).ok_or(JoinError::RoomNotFound)?;

        if room.members.len() >= room.max_clients as usize {
            return Err(JoinError::RoomFull);
        }

        let host = room
            .members
            .get(&room.host_id)
            .copied()
            .ok_or(JoinError::RoomNotFound)?;

        room.members.insert(member.client_id, member);

        Ok(host)
    }

    pub async fn lookup(&self, room_id: &str) -> Option<Room> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Removes `client_id` from every room it occupies. A room whose host
    /// leaves is removed outright; there is no host promotion.
    pub async fn evict(&self, client_id: ClientId) -> Vec<Eviction> {
        let mut rooms = self.rooms.write().await;
        let mut evictions = Vec::new();

        rooms.retain(|room_id, room| {
            if room.members.remove(&client_id).is_none() {
                return true;
            }

            let closed = room.host_id == client_id;

            evictions.push(Eviction {
                room_id: room_id.clone(),
                closed,
                notify: room.members.keys().copied().collect(),
            });

            !closed
        });

        evictions
    }
}

fn generate_room_id() -> String {
    let mut rng = rand::rng();

    (0..ROOM_ID_LENGTH)
        .map(|_| ROOM_ID_CHARS[rng.random_range(0..ROOM_ID_CHARS.len())] as char)
        .collect()
}
