use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthornetError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream index returned status {status} for query `{query}`")]
    UpstreamStatus { status: u16, query: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{author} ({name_key}) has multiple ORCIDs: {recorded} and {conflicting}")]
    OrcidConflict {
        name_key: String,
        author: String,
        recorded: String,
        conflicting: String,
    },

    #[error("Network capabilities capped: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuthornetError {
    /// Failures of a single upstream fetch. The frontier contains these and
    /// treats the page as empty.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AuthornetError::Http(_)
                | AuthornetError::UpstreamStatus { .. }
                | AuthornetError::Serialization(_)
                | AuthornetError::Security(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AuthornetError>;
