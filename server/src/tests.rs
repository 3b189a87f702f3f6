//! End-to-end scenarios against a real listener on a loopback port.

use std::time::Duration;

use serde_json::json;
use shared::{
    envelope::Envelope,
    message_kind::MessageKind,
    payload::{
        ClientConnection, ClientData, ClientId, CreateRoomRequest, CreateRoomResponse,
        JoinRoomRequest, JoinRoomResponse, LeaveRoomNotification,
    },
    received_envelope::ReceivedEnvelope,
};
use tokio::{io::AsyncWriteExt, net::TcpStream, time::timeout};

use crate::server::RendezvousServer;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

async fn start_server() -> String {
    let server = RendezvousServer::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.listen().await;
    });

    addr.to_string()
}

/// Connects and consumes the unconditional `client/connection` envelope.
async fn connect(addr: &str) -> (TcpStream, ClientId) {
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let envelope = recv(&mut stream).await;
    assert_eq!(envelope.kind, "client/connection");

    let connection: ClientConnection = serde_json::from_value(envelope.data).unwrap();
    (stream, connection.client_id)
}

async fn recv(stream: &mut TcpStream) -> Envelope {
    let received = timeout(RECV_TIMEOUT, Envelope::read_from_stream(stream))
        .await
        .expect("timed out waiting for an envelope")
        .expect("read failed");

    match received {
        ReceivedEnvelope::Envelope(envelope) => envelope,
        ReceivedEnvelope::Eof => panic!("unexpected EOF"),
    }
}

async fn assert_silent(stream: &mut TcpStream) {
    assert!(
        timeout(SILENCE_WINDOW, Envelope::read_from_stream(stream))
            .await
            .is_err()
    );
}

async fn create_room(
    stream: &mut TcpStream,
    max_clients: u32,
    send_port: u16,
    recv_port: u16,
) -> String {
    Envelope::new(
        MessageKind::CreateRoom,
        &CreateRoomRequest {
            max_clients,
            send_port,
            recv_port,
        },
    )
    .unwrap()
    .write_to_stream(stream)
    .await
    .unwrap();

    let response = recv(stream).await;
    assert_eq!(response.kind, "@response room/create");

    let response: CreateRoomResponse = serde_json::from_value(response.data).unwrap();
    response.room_id
}

async fn join_room(
    stream: &mut TcpStream,
    room_id: &str,
    send_port: u16,
    recv_port: u16,
) -> JoinRoomResponse {
    Envelope::new(
        MessageKind::JoinRoom,
        &JoinRoomRequest {
            room_id: room_id.to_string(),
            send_port,
            recv_port,
        },
    )
    .unwrap()
    .write_to_stream(stream)
    .await
    .unwrap();

    let response = recv(stream).await;
    assert_eq!(response.kind, "@response room/join");

    serde_json::from_value(response.data).unwrap()
}

#[tokio::test]
async fn create_and_join_exchange_endpoints() {
    let addr = start_server().await;

    let (mut host, host_id) = connect(&addr).await;
    let room_id = create_room(&mut host, 2, 100, 200).await;
    assert!(shared::is_valid_room_id(&room_id));

    let (mut joiner, joiner_id) = connect(&addr).await;
    assert_ne!(host_id, joiner_id);

    let response = join_room(&mut joiner, &room_id, 300, 400).await;
    assert!(response.success);
    assert_eq!(response.room_id, room_id);
    assert_eq!(response.msg, None);

    let host_data = response.host_data.unwrap();
    assert_eq!(host_data.client_id, host_id);
    assert_eq!(host_data.network_data.ip, "127.0.0.1");
    assert_eq!(host_data.network_data.send_port, 100);
    assert_eq!(host_data.network_data.recv_port, 200);

    let notification = recv(&mut host).await;
    assert_eq!(notification.kind, "@notification room/join");

    let joined: ClientData = serde_json::from_value(notification.data).unwrap();
    assert_eq!(joined.client_id, joiner_id);
    assert_eq!(joined.network_data.ip, "127.0.0.1");
    assert_eq!(joined.network_data.send_port, 300);
    assert_eq!(joined.network_data.recv_port, 400);
}

#[tokio::test]
async fn joining_an_unknown_room_notifies_nobody() {
    let addr = start_server().await;

    let (mut host, _) = connect(&addr).await;
    create_room(&mut host, 2, 100, 200).await;

    let (mut joiner, _) = connect(&addr).await;
    let response = join_room(&mut joiner, "ZZZZZZ", 300, 400).await;

    assert!(!response.success);
    assert_eq!(response.room_id, "ZZZZZZ");
    assert_eq!(response.msg.as_deref(), Some("Room not found"));
    assert!(response.host_data.is_none());

    assert_silent(&mut host).await;
}

#[tokio::test]
async fn a_full_room_rejects_further_joiners() {
    let addr = start_server().await;

    let (mut host, _) = connect(&addr).await;
    let room_id = create_room(&mut host, 2, 100, 200).await;

    let (mut first, _) = connect(&addr).await;
    assert!(join_room(&mut first, &room_id, 300, 400).await.success);

    let (mut second, _) = connect(&addr).await;
    let response = join_room(&mut second, &room_id, 500, 600).await;

    assert!(!response.success);
    assert_eq!(response.msg.as_deref(), Some("Room is full"));
    assert!(response.host_data.is_none());

    // Only the first join reached the host.
    let notification = recv(&mut host).await;
    assert_eq!(notification.kind, "@notification room/join");
    assert_silent(&mut host).await;
}

#[tokio::test]
async fn unrecognized_types_are_dropped_silently() {
    let addr = start_server().await;

    let (mut stream, _) = connect(&addr).await;

    let bogus = Envelope {
        kind: "room/destroy".to_string(),
        data: json!({}),
    };
    bogus.write_to_stream(&mut stream).await.unwrap();
    assert_silent(&mut stream).await;

    // The connection is still serviceable afterwards.
    create_room(&mut stream, 2, 100, 200).await;
}

#[tokio::test]
async fn malformed_frames_only_cost_the_offending_message() {
    let addr = start_server().await;

    let (mut stream, _) = connect(&addr).await;

    let garbage = b"not json at all";
    stream
        .write_all(&(garbage.len() as u32).to_be_bytes())
        .await
        .unwrap();
    stream.write_all(garbage).await.unwrap();

    assert_silent(&mut stream).await;
    create_room(&mut stream, 2, 100, 200).await;
}

#[tokio::test]
async fn a_leaving_member_is_announced_to_the_room() {
    let addr = start_server().await;

    let (mut host, _) = connect(&addr).await;
    let room_id = create_room(&mut host, 2, 100, 200).await;

    let (mut joiner, joiner_id) = connect(&addr).await;
    assert!(join_room(&mut joiner, &room_id, 300, 400).await.success);

    let notification = recv(&mut host).await;
    assert_eq!(notification.kind, "@notification room/join");

    drop(joiner);

    let notification = recv(&mut host).await;
    assert_eq!(notification.kind, "@notification room/leave");

    let left: LeaveRoomNotification = serde_json::from_value(notification.data).unwrap();
    assert_eq!(left.client_id, joiner_id);
    assert_eq!(left.room_id, room_id);
}

#[tokio::test]
async fn a_room_dies_with_its_host() {
    let addr = start_server().await;

    let (mut host, host_id) = connect(&addr).await;
    let room_id = create_room(&mut host, 3, 100, 200).await;

    let (mut member, _) = connect(&addr).await;
    assert!(join_room(&mut member, &room_id, 300, 400).await.success);

    drop(host);

    // The surviving member hears about the host leaving; by then the room
    // is gone, so the id no longer resolves.
    let notification = recv(&mut member).await;
    assert_eq!(notification.kind, "@notification room/leave");

    let left: LeaveRoomNotification = serde_json::from_value(notification.data).unwrap();
    assert_eq!(left.client_id, host_id);
    assert_eq!(left.room_id, room_id);

    let (mut late, _) = connect(&addr).await;
    let response = join_room(&mut late, &room_id, 500, 600).await;
    assert!(!response.success);
    assert_eq!(response.msg.as_deref(), Some("Room not found"));
}
