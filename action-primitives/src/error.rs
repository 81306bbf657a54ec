//! Shared error definitions for action primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the action runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided identifier could not be parsed.
    #[error("invalid identifier: {source}")]
    InvalidId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// A schema field definition failed validation.
    #[error("invalid schema field `{field}`: {reason}")]
    InvalidSchemaField {
        /// The offending field name.
        field: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}
