use crate::agent::validator::RejectionReason;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Nl2SqlError {
    #[error("schema unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("query rejected ({reason}){}", identifier.as_deref().map(|i| format!(": {}", i)).unwrap_or_default())]
    ValidationRejected {
        reason: RejectionReason,
        identifier: Option<String>,
        query: String,
    },

    #[error("query execution failed: {message}")]
    ExecutionFailure { message: String, query: String },

    #[error("unsupported locale: question does not look like {expected}")]
    UnsupportedLocale { expected: String },

    #[error("question is empty")]
    EmptyQuestion,

    #[error("language model error: {0}")]
    LanguageModel(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

impl From<tokio_postgres::Error> for Nl2SqlError {
    fn from(e: tokio_postgres::Error) -> Self {
        // db_error carries the server-side message; the Display of the
        // outer error is just "db error" for those
        match e.as_db_error() {
            Some(db) => Nl2SqlError::Database(db.message().to_string()),
            None => Nl2SqlError::Database(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for Nl2SqlError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Nl2SqlError::LanguageModel(format!("request timed out: {}", e))
        } else {
            Nl2SqlError::LanguageModel(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Nl2SqlError>;
