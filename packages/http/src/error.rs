use storeview_core::Error as CoreError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

impl From<Error> for CoreError {
    fn from(error: Error) -> Self {
        match error {
            Error::Http(e) if e.is_timeout() => CoreError::Transport {
                message: format!("request timed out: {}", e),
            },
            Error::Http(e) => CoreError::Transport {
                message: e.to_string(),
            },
            Error::Status { status, url } => CoreError::RemoteStatus {
                status,
                message: url,
            },
            Error::Json(e) => CoreError::Decode {
                message: e.to_string(),
            },
            Error::Config { message } => CoreError::Config { message },
            other @ (Error::UrlParse(_) | Error::InvalidUrl { .. }) => CoreError::Config {
                message: other.to_string(),
            },
        }
    }
}
