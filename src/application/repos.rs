//! Repository trait describing the content-source adapter.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::{PostNumber, PostRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream returned HTTP status {status}")]
    Status { status: u16 },
    #[error("upstream rejected the query: {message}")]
    Query { message: String },
    #[error("upstream response malformed: {message}")]
    Malformed { message: String },
}

impl RepoError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Read access to the issue tracker backing the blog.
///
/// `Ok(None)` means the id resolved cleanly to "no such issue"; every other
/// failure mode is a `RepoError`.
#[async_trait]
pub trait IssuesRepo: Send + Sync {
    async fn issue_by_number(&self, number: PostNumber) -> Result<Option<PostRecord>, RepoError>;
}
