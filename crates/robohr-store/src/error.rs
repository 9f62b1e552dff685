//! Error types for the store crate.

use thiserror::Error;

/// Errors returned by domain store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store refused the operation for a business reason.
    /// The message is meant for the end user.
    #[error("{0}")]
    Rejected(String),

    /// The store could not be reached or failed unexpectedly.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend(reason.into())
    }
}
