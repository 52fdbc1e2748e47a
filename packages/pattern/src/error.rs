//! Typed errors for the pattern library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! recoverable strategy failure from a misuse of the API.

use thiserror::Error;

use crate::page::ElementKey;

/// Errors that can occur while learning or refining a pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    /// Fewer than two distinct samples were supplied
    #[error("at least 2 sample elements are required, got {count}")]
    NotEnoughSamples { count: usize },

    /// The samples do not share a tag, so no structural rule can cover them
    #[error("samples have no common tag")]
    StructuralMismatch,

    /// A generated selector could not be parsed or evaluated
    #[error("invalid selector `{selector}`: {reason}")]
    SelectorInvalid { selector: String, reason: String },

    /// An element key that the page never issued
    #[error("unknown element {key}")]
    UnknownElement { key: ElementKey },
}

/// Result type alias for pattern operations.
pub type Result<T> = std::result::Result<T, PatternError>;
