/// Result alias that carries the custom [`ArmMotionError`] type.
pub type Result<T> = std::result::Result<T, ArmMotionError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum ArmMotionError {
    /// Free-form message for conditions that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// A pose fed into a session does not match the channel count established
    /// by the rest of its pose list or recording.
    #[error("pose has {actual} channels, expected {expected}")]
    ChannelMismatch { expected: usize, actual: usize },
    /// A recorded motion whose timestamps are not strictly increasing.
    #[error("recorded motion timestamps must be strictly increasing (frame {frame})")]
    NonMonotonicTimestamps { frame: usize },
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// WAV decoding failure while building an amplitude envelope.
    #[error("{0}")]
    Wav(#[from] hound::Error),
    /// JSON (de)serialization failure for pose lists and recordings.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl ArmMotionError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for ArmMotionError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ArmMotionError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
