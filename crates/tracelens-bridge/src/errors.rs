#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid bugreport content: {0}")]
    InvalidContent(#[from] base64::DecodeError),

    #[error("attachment fetch failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("peer channel closed")]
    ChannelClosed,
}

impl BridgeError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::InvalidContent(_) => "invalid_content",
            Self::Io(_) => "io",
            Self::ChannelClosed => "channel_closed",
        }
    }
}
