//! Error types for the search engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Criterion of type {criterion} cannot be applied to the data type {data_type}. \
         [fieldName={field}, dataTypeByPropertyCode={data_types}]"
    )]
    TypeMismatch {
        criterion: String,
        field: String,
        data_type: String,
        data_types: String,
    },

    #[error("Unknown field '{field}' referenced by {criterion}")]
    UnknownField { criterion: String, field: String },

    #[error("Invalid search value: {0}")]
    InvalidValue(String),

    /// A criteria tree reached translation in a shape that validation should have rejected.
    #[error("Translation error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Executor error: {0}")]
    Executor(String),

    #[error("Search timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification used by callers to map errors onto their response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is wrong; never retried.
    User,
    /// A bug in the engine or its inputs.
    Internal,
    /// Database, executor or timeout failure.
    Infrastructure,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TypeMismatch { .. } | Error::UnknownField { .. } | Error::InvalidValue(_) => {
                ErrorKind::User
            }
            Error::Internal(_) | Error::Config(_) | Error::Other(_) => {
                tracing::error!("Internal error: {}", self);
                ErrorKind::Internal
            }
            Error::Database(_) | Error::Executor(_) | Error::Timeout(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::TypeMismatch { .. } | Error::UnknownField { .. } | Error::InvalidValue(_)
        )
    }
}

impl From<labsearch_criteria::Error> for Error {
    fn from(err: labsearch_criteria::Error) -> Self {
        match err {
            labsearch_criteria::Error::TypeMismatch {
                criterion,
                field,
                data_type,
                data_types,
            } => Error::TypeMismatch {
                criterion,
                field,
                data_type,
                data_types,
            },
            labsearch_criteria::Error::UnknownField { criterion, field } => {
                Error::UnknownField { criterion, field }
            }
            labsearch_criteria::Error::InvalidValue(msg) => Error::InvalidValue(msg),
        }
    }
}
