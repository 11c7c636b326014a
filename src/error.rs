use thiserror::Error;

/// Errors surfaced by the client library.
///
/// Display is the raw message so that notifications carry the backend's own text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TodoError {
    /// Invalid credentials, expired or missing session.
    #[error("{0}")]
    Auth(String),

    /// Network or service failure, permission denial.
    #[error("{0}")]
    Query(String),

    /// Client-side rejection; the request is never sent.
    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TodoError {
    pub fn auth(message: impl Into<String>) -> Self {
        TodoError::Auth(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        TodoError::Query(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TodoError::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        TodoError::Config(message.into())
    }

    /// Stable code for machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            TodoError::Auth(_) => "AUTH_ERROR",
            TodoError::Query(_) => "QUERY_ERROR",
            TodoError::Validation(_) => "VALIDATION_ERROR",
            TodoError::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, TodoError::Validation(_))
    }
}

impl From<reqwest::Error> for TodoError {
    fn from(err: reqwest::Error) -> Self {
        TodoError::Query(err.to_string())
    }
}

impl From<url::ParseError> for TodoError {
    fn from(err: url::ParseError) -> Self {
        TodoError::Config(format!("invalid URL: {}", err))
    }
}

impl From<serde_json::Error> for TodoError {
    fn from(err: serde_json::Error) -> Self {
        TodoError::Query(format!("unexpected response body: {}", err))
    }
}
