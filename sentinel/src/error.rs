//! Error type shared by the API client and the metric services.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Backend answered with a non-2xx status.
    #[error("HTTP {status} from {path}")]
    Status { status: u16, path: String },

    /// Connection refused, reset, TLS failure, timeout inside reqwest...
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Body arrived but does not match the expected JSON shape.
    #[error("unexpected payload from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// 2xx reply whose body reports a failure (`success: false`).
    #[error("{0}")]
    Backend(String),

    #[error("unparseable timestamp '{value}'")]
    Timestamp { value: String },

    #[error("invalid base URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("TLS CA: {0}")]
    Tls(String),
}
