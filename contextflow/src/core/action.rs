//! Pipeline outcome type.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Transport-agnostic classification of an error outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    /// The request was malformed.
    BadRequest,
    /// The caller is not authenticated.
    Unauthorized,
    /// The caller may not perform the operation.
    Forbidden,
    /// The target does not exist.
    NotFound,
    /// The request conflicts with current state.
    Conflict,
    /// Downstream work did not finish in time.
    Timeout,
    /// A dependency is temporarily unavailable.
    Unavailable,
    /// An unexpected failure.
    Internal,
}

impl ErrorStatus {
    /// Suggested HTTP status code for transports that speak HTTP.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
            Self::Unavailable => 503,
            Self::Timeout => 504,
        }
    }

    /// Returns true if the caller may retry the same request later.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable)
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Discriminant of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A success payload.
    Success,
    /// An error payload.
    Error,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The outcome of a filter chain.
///
/// Returned by the final handler and by every filter. Transport code picks
/// its serialization from [`Action::kind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// The operation succeeded.
    Success {
        /// The result payload.
        payload: serde_json::Value,
    },
    /// The operation failed.
    Error {
        /// Error classification.
        status: ErrorStatus,
        /// Payload describing the error.
        payload: serde_json::Value,
    },
}

impl Action {
    /// Creates a success outcome.
    #[must_use]
    pub const fn success(payload: serde_json::Value) -> Self {
        Self::Success { payload }
    }

    /// Creates a success outcome with a null payload.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Success {
            payload: serde_json::Value::Null,
        }
    }

    /// Creates an error outcome.
    #[must_use]
    pub const fn error(status: ErrorStatus, payload: serde_json::Value) -> Self {
        Self::Error { status, payload }
    }

    /// Creates an error outcome with a `{"message": ...}` payload.
    #[must_use]
    pub fn error_message(status: ErrorStatus, message: impl Into<String>) -> Self {
        Self::error(status, serde_json::json!({ "message": message.into() }))
    }

    /// Returns the discriminant.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Success { .. } => ActionKind::Success,
            Self::Error { .. } => ActionKind::Error,
        }
    }

    /// Returns true for success outcomes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true for error outcomes.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns the error classification, if this is an error.
    #[must_use]
    pub const fn error_status(&self) -> Option<ErrorStatus> {
        match self {
            Self::Success { .. } => None,
            Self::Error { status, .. } => Some(*status),
        }
    }

    /// Suggested HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Success { .. } => 200,
            Self::Error { status, .. } => status.status_code(),
        }
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &serde_json::Value {
        match self {
            Self::Success { payload } | Self::Error { payload, .. } => payload,
        }
    }

    /// Consumes the action and returns its payload.
    #[must_use]
    pub fn into_payload(self) -> serde_json::Value {
        match self {
            Self::Success { payload } | Self::Error { payload, .. } => payload,
        }
    }

    /// Transforms a success payload; errors pass through untouched.
    #[must_use]
    pub fn map_payload(self, f: impl FnOnce(serde_json::Value) -> serde_json::Value) -> Self {
        match self {
            Self::Success { payload } => Self::Success { payload: f(payload) },
            error @ Self::Error { .. } => error,
        }
    }
}

/// An error a handler can raise to request a specific error outcome.
///
/// Error-translating filters recognise it and keep its status instead of
/// reporting an internal failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{status}: {message}")]
pub struct ActionFailure {
    /// Requested classification.
    pub status: ErrorStatus,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    pub details: Option<serde_json::Value>,
}

impl ActionFailure {
    /// Creates a failure with a status and message.
    #[must_use]
    pub fn new(status: ErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// A `NotFound` failure.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorStatus::NotFound, message)
    }

    /// A `BadRequest` failure.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorStatus::BadRequest, message)
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Converts the failure into an error outcome.
    #[must_use]
    pub fn to_action(&self) -> Action {
        let mut payload = serde_json::json!({ "message": self.message });
        if let (Some(details), Some(map)) = (&self.details, payload.as_object_mut()) {
            map.insert("details".to_string(), details.clone());
        }
        Action::error(self.status, payload)
    }
}
