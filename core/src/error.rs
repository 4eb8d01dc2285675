use crate::DocId;
use thiserror::Error;

/// Errors surfaced while evaluating a query.
///
/// Unknown terms are not an error: they resolve to an empty posting set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Malformed boolean or proximity syntax.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl QueryError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        QueryError::InvalidQuery(reason.into())
    }

    /// The human-readable reason, without the `invalid query:` prefix.
    pub fn reason(&self) -> &str {
        match self {
            QueryError::InvalidQuery(reason) => reason,
        }
    }
}

/// Errors raised during the build phase.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The same id was fed to the builder twice.
    #[error("document {0} already indexed")]
    DuplicateDocument(DocId),
}
