use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced to callers of the resolver.
///
/// Upstream failures that still leave something to return are not errors:
/// they come back as a partial or failed [`RecipeResult`](super::RecipeResult).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream failed: {0}")]
    Upstream(String),

    #[error("store error: {0}")]
    Persistence(#[from] StoreError),
}

impl ResolveError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ResolveError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// HTTP-equivalent status for the error.
    ///
    /// Upstream failures are 422: the input (a site or id) is the problem and
    /// the caller may retry with another one.
    pub fn status_code(&self) -> u16 {
        match self {
            ResolveError::Validation { .. } => 400,
            ResolveError::NotFound(_) => 404,
            ResolveError::Upstream(_) => 422,
            ResolveError::Persistence(_) => 500,
        }
    }
}
