use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpotwatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Status code: {code}, error: {reason} ({url})")]
    Status {
        url: String,
        code: u16,
        reason: String,
    },

    #[error("Report decode error at position {position}: {message}")]
    Decode { message: String, position: usize },

    #[error("More than one fact of kind {kind}, found {found}")]
    DuplicateFact { kind: String, found: usize },

    #[error("Conflict updating PipelineActivity {name}: {message}")]
    Conflict { name: String, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),
}

impl From<rustls::Error> for SpotwatchError {
    fn from(e: rustls::Error) -> Self {
        SpotwatchError::Tls(e.to_string())
    }
}

impl SpotwatchError {
    /// Short label for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SpotwatchError::Io(_) => "io",
            SpotwatchError::Json(_) => "json",
            SpotwatchError::Transport { .. } => "transport",
            SpotwatchError::Status { .. } => "status",
            SpotwatchError::Decode { .. } => "decode",
            SpotwatchError::DuplicateFact { .. } => "duplicate_fact",
            SpotwatchError::Conflict { .. } => "conflict",
            SpotwatchError::Store(_) => "store",
            SpotwatchError::Tls(_) => "tls",
        }
    }
}

pub type Result<T> = std::result::Result<T, SpotwatchError>;
