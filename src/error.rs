use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while building a detector or loading its configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to build http client: {0}")]
    Http(#[from] wreq::Error),
}

/// Why a single provider lookup was inconclusive.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Transport(#[from] wreq::Error),

    #[error("lookup failed (status {0})")]
    Status(u16),

    #[error("response is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid lookup url: {0}")]
    Url(#[from] url::ParseError),
}

/// Failures opening a negotiation session.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("no rendezvous servers configured")]
    NoServers,

    #[error("no rendezvous server could be resolved")]
    Unresolved,

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}
