/// Shared error type used across all multisession crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The backing store rejected an operation or could not be reached.
    #[error("store: {0}")]
    Store(String),

    /// A payload could not be encoded by the configured serializer.
    #[error("codec: {0}")]
    Codec(String),

    /// A stored record exists but its bytes do not decode to a payload.
    #[error("decoding session {key}: {message}")]
    Decode { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
