//! Error types for the pagination core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Error raised by a backend fetch or count function, passed through untouched.
    #[error(transparent)]
    Backend(anyhow::Error),
}

impl GridError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// The backend error, if this is one.
    pub fn backend(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Backend(err) => Some(err),
            Self::InvalidArgument(_) => None,
        }
    }
}

pub type GridResult<T> = Result<T, GridError>;
