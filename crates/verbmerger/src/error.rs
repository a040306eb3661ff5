//! Error types shared across the crate.

use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;

/// Failure observed by a caller waiting on a generation.
///
/// One value is broadcast to every waiter of a generation, so the type is
/// cheap to clone and carries the processor error behind an `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoalescerError {
    /// The batch processor returned an error for the whole batch.
    #[error("batch processor failed")]
    Processor(#[source] Arc<dyn StdError + Send + Sync>),

    /// The batch processor broke the one-result-per-input contract.
    #[error("batch processor returned {actual} results for {expected} inputs")]
    ResultCountMismatch { expected: usize, actual: usize },

    /// The coalescer was cancelled before the generation was dispatched.
    #[error("coalescer cancelled before the batch was dispatched")]
    Cancelled,

    /// The dispatching task went away without resolving the generation.
    #[error("batch was abandoned before completion")]
    Abandoned,

    /// The generation resolved but no output was written for this request.
    #[error("batch completed without an output for this request")]
    MissingOutput,
}

impl CoalescerError {
    pub(crate) fn processor<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Processor(Arc::new(error))
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("batch interval must be greater than zero")]
    ZeroBatchInterval,

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while building a prompt, calling the model, or reading its answer.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("completion request failed: {0}")]
    Completion(String),

    #[error("malformed response row {row:?}: {reason}")]
    MalformedRow { row: String, reason: String },

    #[error("completion returned {actual} rows for {expected} prompts")]
    TooFewRows { expected: usize, actual: usize },
}

/// Failure surfaced by the merge service.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    Coalescer(#[from] CoalescerError),

    #[error("merge repository failed: {0}")]
    Repository(String),

    #[error("invalid seed row {row:?}: {reason}")]
    Seed { row: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_error_keeps_source() {
        let err = CoalescerError::processor(PromptError::Completion("timeout".into()));
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("completion request failed: timeout"));
    }

    #[test]
    fn test_mismatch_message() {
        let err = CoalescerError::ResultCountMismatch { expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "batch processor returned 2 results for 3 inputs");
    }
}
