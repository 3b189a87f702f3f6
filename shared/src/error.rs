use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid message json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds the frame size limit")]
    FrameTooLarge(usize),
}
