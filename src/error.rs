use std::fmt::{self, Display, Formatter};

use mongodb::error::Error as DbError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Where the current time fell relative to a category's voting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    /// The window has not opened yet.
    NotYetOpen,
    /// The window has already closed.
    Ended,
}

impl Display for WindowStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYetOpen => write!(f, "has not yet opened"),
            Self::Ended => write!(f, "has ended"),
        }
    }
}

/// Every distinct outcome an engine operation can fail with.
///
/// Only `Db` and `Internal` are unexpected; hosts should report those
/// generically and log the detail server-side. Everything else is a
/// user-interpretable rejection.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Caller has already voted in this category")]
    AlreadyVoted,
    #[error("Voting window {0}")]
    WindowInactive(WindowStatus),
    #[error("Voting is still in progress")]
    VotingStillOpen,
    #[error("Result has already been published")]
    AlreadyPublished,
    #[error("Category has no nominees")]
    NoNominees,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Coarse classification for hosts mapping outcomes onto a transport.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::BadRequest,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Forbidden(_) | Self::AlreadyVoted | Self::WindowInactive(_) | Self::VotingStillOpen => {
                ErrorClass::Forbidden
            }
            Self::AlreadyPublished | Self::NoNominees => ErrorClass::Conflict,
            Self::Db(_) | Self::Internal(_) => ErrorClass::Internal,
        }
    }
}

/// Transport-agnostic response classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    NotFound,
    Forbidden,
    Conflict,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_faults_are_reported_generically() {
        assert_eq!(Error::Internal("boom".to_string()).class(), ErrorClass::Internal);
        assert_eq!(
            Error::WindowInactive(WindowStatus::Ended).class(),
            ErrorClass::Forbidden
        );
        assert_eq!(Error::AlreadyPublished.class(), ErrorClass::Conflict);
    }
}
