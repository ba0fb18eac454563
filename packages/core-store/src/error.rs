//! Error types for the core layer.

/// Failures that escape a projection.
///
/// Missing fields, missing keys and non-container fields are not errors at
/// this level: the engine records them inside the projection itself. Everything
/// here is unexpected and aborts the request.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A value could not be turned into JSON.
    #[error("cannot normalize value: {message}")]
    Normalize { message: String },

    /// The backing store of a remote map could not be reached.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The backing store of a remote map answered with an unexpected status.
    #[error("remote store answered {status}: {message}")]
    RemoteStatus { status: u16, message: String },

    /// A remote payload did not have the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// A storage snapshot document could not be turned into a storage tree.
    #[error("invalid snapshot: {message}")]
    Snapshot { message: String },

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn normalize(message: impl Into<String>) -> Self {
        Error::Normalize {
            message: message.into(),
        }
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        Error::Snapshot {
            message: message.into(),
        }
    }
}
