use strum_macros::{Display, EnumString};

/// Every message type spoken on the wire. Requests come from clients,
/// `@response`/`@notification` types only ever come from the server.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Display, EnumString)]
pub enum MessageKind {
    #[strum(serialize = "client/connection")]
    ClientConnection,

    #[strum(serialize = "room/create")]
    CreateRoom,

    #[strum(serialize = "@response room/create")]
    CreateRoomResponse,

    #[strum(serialize = "room/join")]
    JoinRoom,

    #[strum(serialize = "@response room/join")]
    JoinRoomResponse,

    #[strum(serialize = "@notification room/join")]
    JoinRoomNotification,

    #[strum(serialize = "@notification room/leave")]
    LeaveRoomNotification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_round_trip() {
        let kinds = [
            MessageKind::ClientConnection,
            MessageKind::CreateRoom,
            MessageKind::CreateRoomResponse,
            MessageKind::JoinRoom,
            MessageKind::JoinRoomResponse,
            MessageKind::JoinRoomNotification,
            MessageKind::LeaveRoomNotification,
        ];

        for kind in kinds {
            assert_eq!(kind.to_string().parse::<MessageKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_strings_do_not_parse() {
        assert!("room/destroy".parse::<MessageKind>().is_err());
    }
}
