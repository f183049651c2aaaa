//! Error types for the contextflow framework.
//!
//! Library errors are `thiserror` enums. Failures raised by filters and final
//! handlers travel through the chain as `anyhow::Error` so that they reach the
//! enclosing filter unchanged.

use thiserror::Error;

/// Errors raised by the request-scoped context store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// A store accessor was called outside any `begin`/`restore` scope.
    #[error("no active context scope for `{operation}`")]
    NoActiveContext {
        /// The accessor that was called.
        operation: &'static str,
    },

    /// The stored value has a different shape than the one requested.
    #[error("context value `{key}` is not a {expected}")]
    TypeMismatch {
        /// The key that was read.
        key: String,
        /// The expected value type.
        expected: &'static str,
    },

    /// The scope already holds the maximum number of entries.
    #[error("context scope is full ({limit} entries); cannot insert `{key}`")]
    CapacityExceeded {
        /// The key that was rejected.
        key: String,
        /// The configured entry limit.
        limit: usize,
    },
}

/// Failure outcome of a [`ContextTask`](crate::task::ContextTask).
#[derive(Debug, Error)]
pub enum TaskError {
    /// The computation or one of its continuations returned an error.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// A context store access failed inside the computation.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A continuation panicked.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The spawned task was aborted before completing.
    #[error("task cancelled: {0}")]
    Cancelled(String),

    /// `first` was called with no tasks.
    #[error("no tasks to race")]
    NoTasks,
}

impl TaskError {
    /// Creates a failure from a message.
    #[must_use]
    pub fn msg(message: impl std::fmt::Display + std::fmt::Debug + Send + Sync + 'static) -> Self {
        Self::Failed(anyhow::Error::msg(message))
    }

    /// Returns true if the failure came from a panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// Extracts a readable message from a panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked(message)
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value `{value}` for {var}: {reason}")]
    InvalidEnv {
        /// The variable name.
        var: String,
        /// The raw value.
        value: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A field holds a value outside its allowed range.
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidField {
        /// The field name.
        field: &'static str,
        /// Why the value is rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a field validation error.
    #[must_use]
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_active_context_message() {
        let err = ContextError::NoActiveContext { operation: "put" };
        assert_eq!(err.to_string(), "no active context scope for `put`");
    }

    #[test]
    fn test_capacity_message() {
        let err = ContextError::CapacityExceeded {
            key: "tenant".to_string(),
            limit: 2,
        };
        assert!(err.to_string().contains("2 entries"));
    }

    #[test]
    fn test_task_error_from_panic_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let err = TaskError::from_panic(payload.as_ref());
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "task panicked: boom");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(
            TaskError::from_panic(payload.as_ref()).to_string(),
            "task panicked: owned boom"
        );
    }

    #[test]
    fn test_task_error_transparent() {
        let err = TaskError::from(ContextError::NoActiveContext { operation: "get" });
        assert_eq!(err.to_string(), "no active context scope for `get`");

        let err = TaskError::msg("downstream failed");
        assert_eq!(err.to_string(), "downstream failed");
    }

    #[test]
    fn test_config_error_message() {
        let err = ConfigError::invalid_field("timeout_ms", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid configuration for `timeout_ms`: must be greater than zero"
        );
    }
}
