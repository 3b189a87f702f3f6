use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    MAX_FRAME_LEN, error::ProtocolError, message_kind::MessageKind,
    received_envelope::ReceivedEnvelope,
};

/// One logical message: `{"type": <string>, "data": <object>}`.
///
/// On the wire each envelope is a 4-byte big-endian length prefix followed
/// by that many bytes of JSON, so one framed read always yields one whole
/// message regardless of how the transport splits the bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

impl Envelope {
    pub fn new<T>(kind: MessageKind, data: &T) -> Result<Self, ProtocolError>
    where
        T: Serialize,
    {
        Ok(Self {
            kind: kind.to_string(),
            data: serde_json::to_value(data)?,
        })
    }

    pub async fn write_to_stream<W>(&self, stream: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin,
    {
        let payload = serde_json::to_vec(self)?;

        if payload.len() > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge(payload.len()));
        }

        stream
            .write_all(&(payload.len() as u32).to_be_bytes())
            .await?;
        stream.write_all(&payload).await?;

        Ok(())
    }

    pub async fn read_from_stream<R>(stream: &mut R) -> Result<ReceivedEnvelope, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mut len_buf = [0u8; 4];

        // A zero-length first read is a clean disconnect; anything short of
        // the full prefix after that means the peer died mid-frame.
        match stream.read(&mut len_buf).await {
            Ok(0) => return Ok(ReceivedEnvelope::Eof),
            Ok(n) if n < len_buf.len() => stream.read_exact(&mut len_buf[n..]).await.map(|_| ())?,
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_be_bytes(len_buf) as usize;

        if len > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge(len));
        }

        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await?;

        let envelope = serde_json::from_slice(&payload)?;

        Ok(ReceivedEnvelope::Envelope(envelope))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{AsyncWriteExt, duplex};

    use super::*;

    #[tokio::test]
    async fn frames_survive_a_round_trip() {
        let (mut a, mut b) = duplex(1024);

        let sent = Envelope::new(
            MessageKind::CreateRoom,
            &json!({ "max_clients": 2, "send_port": 100, "recv_port": 200 }),
        )
        .unwrap();
        sent.write_to_stream(&mut a).await.unwrap();

        match Envelope::read_from_stream(&mut b).await.unwrap() {
            ReceivedEnvelope::Envelope(received) => {
                assert_eq!(received.kind, "room/create");
                assert_eq!(received.data["max_clients"], 2);
                assert_eq!(received.data["send_port"], 100);
            }
            ReceivedEnvelope::Eof => panic!("unexpected EOF"),
        }
    }

    #[tokio::test]
    async fn closed_stream_reads_as_eof() {
        let (a, mut b) = duplex(64);
        drop(a);

        assert!(matches!(
            Envelope::read_from_stream(&mut b).await.unwrap(),
            ReceivedEnvelope::Eof
        ));
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let (mut a, mut b) = duplex(64);
        a.write_all(&((MAX_FRAME_LEN + 1) as u32).to_be_bytes())
            .await
            .unwrap();

        assert!(matches!(
            Envelope::read_from_stream(&mut b).await,
            Err(ProtocolError::FrameTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn malformed_json_fails_without_desyncing_the_stream() {
        let (mut a, mut b) = duplex(1024);

        let garbage = b"this is not json";
        a.write_all(&(garbage.len() as u32).to_be_bytes())
            .await
            .unwrap();
        a.write_all(garbage).await.unwrap();

        let follow_up =
            Envelope::new(MessageKind::ClientConnection, &json!({ "client_id": 1 })).unwrap();
        follow_up.write_to_stream(&mut a).await.unwrap();

        assert!(matches!(
            Envelope::read_from_stream(&mut b).await,
            Err(ProtocolError::Json(_))
        ));

        match Envelope::read_from_stream(&mut b).await.unwrap() {
            ReceivedEnvelope::Envelope(received) => {
                assert_eq!(received.kind, "client/connection");
            }
            ReceivedEnvelope::Eof => panic!("unexpected EOF"),
        }
    }
}
