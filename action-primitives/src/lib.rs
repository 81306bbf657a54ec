//! Core shared types for the bot action runtime.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod outcome;
mod schema;

/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifiers for queued tasks and bridge requests.
pub use ids::{RequestId, TaskId};
/// Uniform result value produced by every action execution.
pub use outcome::{ActionOutcome, ErrorCode};
/// Parameter maps and the declarative schema that describes them.
pub use schema::{Params, ParamsSchema};
