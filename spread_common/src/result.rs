//! Result type alias shared across the workspace.
use crate::error::SpreadError;

/// Workspace-wide `Result` alias with `SpreadError` as the default error.
pub type Result<T, E = SpreadError> = std::result::Result<T, E>;
