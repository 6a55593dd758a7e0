//! Post identity and the issue-backed post record.

use time::OffsetDateTime;

use crate::domain::error::DomainError;

/// Positive issue number identifying one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostNumber(u64);

impl PostNumber {
    pub fn new(value: u64) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::validation("post number must be positive"));
        }
        Ok(Self(value))
    }

    /// Parse the string form of a route parameter.
    ///
    /// Rejects anything that is not a plain positive decimal integer, so the
    /// request can be classified as bad input before any upstream query runs.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(DomainError::validation(format!(
                "`{raw}` is not a post number"
            )));
        }
        let value: u64 = trimmed
            .parse()
            .map_err(|_| DomainError::validation(format!("`{raw}` is out of range")))?;
        Self::new(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PostNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRecord {
    pub name: String,
}

/// One blog entry as fetched from the issue tracker.
///
/// Constructed once per request from the upstream response and dropped when
/// the response has been sent; there is no write path.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub number: u64,
    pub url: String,
    pub title: String,
    pub created_at: OffsetDateTime,
    pub labels: Vec<LabelRecord>,
    pub body_html: String,
}

impl PostRecord {
    /// Label names are rendering keys; duplicates from the upstream are
    /// collapsed, keeping first occurrence order.
    pub fn dedupe_labels(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.labels.retain(|label| seen.insert(label.name.clone()));
    }
}
