//! Errors raised by canon governance operations.
//!
//! Every failure here is local and synchronous. Callers are expected to show
//! the error to the author and let them decide; nothing is retried.

use crate::chapter::ChapterState;
use crate::rules::TermCategory;
use thiserror::Error;

/// Errors from rule store mutations, lookups and scans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    /// Malformed input to a mutating call (blank pattern, missing source,
    /// unknown category tag).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The pattern already exists in the category after normalization.
    #[error("Duplicate pattern '{pattern}' in category {category}")]
    DuplicatePattern {
        pattern: String,
        category: TermCategory,
    },

    /// The canon key was never declared.
    #[error("Canon fact not found: {0}")]
    NotFound(String),

    /// A scan asked for a chapter with no resolvable scope.
    #[error("No rule scope declared for chapter '{0}'")]
    InvalidScope(String),

    /// The chapter is locked and must be unlocked with a reason first.
    #[error("Chapter '{chapter}' is {state}; unlock it with a reason first")]
    ChapterLocked { chapter: String, state: ChapterState },

    /// The requested chapter state change is not in the transition table.
    #[error("Invalid transition for chapter '{chapter}': {from} -> {to}")]
    InvalidTransition {
        chapter: String,
        from: ChapterState,
        to: ChapterState,
    },

    /// A research document id that was never registered.
    #[error("Research document not found: {0}")]
    DocumentNotFound(String),
}

impl GovernanceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        GovernanceError::Validation(message.into())
    }
}

/// Result alias for governance operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
