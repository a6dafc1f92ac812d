//! Typed failures at the row-store and sync seams.
//!
//! Command and UI plumbing uses `anyhow`; these enums exist where callers
//! branch on the kind of failure.

use thiserror::Error;

/// Failure while fetching the raw row list.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid API base url '{0}'")]
    BadUrl(String),

    #[error("local store error: {0}")]
    Local(String),
}

/// Failure while persisting one edited cell.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server rejected update with status {0}")]
    Status(u16),

    #[error("no rows for style {style}")]
    MissingRow { style: String, week: u32 },

    #[error("week {week} is before the first week {first} of style {style}")]
    BeforeFirstWeek { style: String, week: u32, first: u32 },

    #[error("store error: {0}")]
    Store(String),

    #[error("commit worker stopped before reporting")]
    WorkerGone,
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            StoreError::Status(status.as_u16())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<reqwest::Error> for CommitError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CommitError::Status(status.as_u16()),
            None => CommitError::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_error_messages() {
        assert_eq!(
            CommitError::Status(409).to_string(),
            "server rejected update with status 409"
        );
        assert_eq!(
            CommitError::MissingRow { style: "ST-9".into(), week: 3 }.to_string(),
            "no rows for style ST-9"
        );
        assert_eq!(
            CommitError::BeforeFirstWeek { style: "ST-9".into(), week: 2, first: 5 }.to_string(),
            "week 2 is before the first week 5 of style ST-9"
        );
    }

    #[test]
    fn test_store_error_messages() {
        assert_eq!(StoreError::Status(500).to_string(), "server responded with status 500");
        assert_eq!(
            StoreError::BadUrl("nope".into()).to_string(),
            "invalid API base url 'nope'"
        );
    }
}
