//! Values held by a context scope.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A value stored under a key in a context scope.
///
/// Header-shaped and tracing data is kept as JSON. Dependency handles
/// (database pools, clients, per-request services) are kept as opaque shared
/// handles and recovered with [`ContextValue::downcast`].
#[derive(Clone)]
pub enum ContextValue {
    /// A JSON value.
    Json(serde_json::Value),
    /// A shared, type-erased handle.
    Handle(Arc<dyn Any + Send + Sync>),
}

impl ContextValue {
    /// Wraps a value as a shared handle.
    #[must_use]
    pub fn handle<T: Any + Send + Sync>(value: T) -> Self {
        Self::Handle(Arc::new(value))
    }

    /// Wraps an existing `Arc` as a shared handle without re-allocating.
    #[must_use]
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self::Handle(value)
    }

    /// Returns the JSON value, if this is one.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Handle(_) => None,
        }
    }

    /// Returns the string content of a JSON string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(serde_json::Value::as_str)
    }

    /// Returns the handle as `Arc<T>` if it holds a `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Handle(handle) => Arc::clone(handle).downcast::<T>().ok(),
            Self::Json(_) => None,
        }
    }

    /// Returns true if this is a handle.
    #[must_use]
    pub const fn is_handle(&self) -> bool {
        matches!(self, Self::Handle(_))
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Handle(_) => f.write_str("Handle(..)"),
        }
    }
}

/// Handles compare by identity, JSON values by content.
impl PartialEq for ContextValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Handle(a), Self::Handle(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        Self::Json(serde_json::Value::String(value.to_string()))
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        Self::Json(serde_json::Value::String(value))
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        Self::Json(serde_json::Value::Bool(value))
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        Self::Json(serde_json::Value::from(value))
    }
}

impl From<u64> for ContextValue {
    fn from(value: u64) -> Self {
        Self::Json(serde_json::Value::from(value))
    }
}

impl From<uuid::Uuid> for ContextValue {
    fn from(value: uuid::Uuid) -> Self {
        Self::Json(serde_json::Value::String(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Pool {
        size: usize,
    }

    #[test]
    fn test_json_conversions() {
        assert_eq!(ContextValue::from("a").as_str(), Some("a"));
        assert_eq!(
            ContextValue::from(42_i64).as_json(),
            Some(&serde_json::json!(42))
        );
        assert_eq!(ContextValue::from(true), ContextValue::Json(serde_json::json!(true)));
    }

    #[test]
    fn test_handle_downcast() {
        let value = ContextValue::handle(Pool { size: 4 });
        assert!(value.is_handle());
        assert_eq!(value.downcast::<Pool>().map(|p| p.size), Some(4));
        assert!(value.downcast::<String>().is_none());
        assert!(value.as_json().is_none());
    }

    #[test]
    fn test_handle_identity_equality() {
        let shared = Arc::new(Pool { size: 1 });
        let a = ContextValue::from_arc(Arc::clone(&shared));
        let b = ContextValue::from_arc(shared);
        let c = ContextValue::handle(Pool { size: 1 });

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, ContextValue::from("pool"));
    }

    #[test]
    fn test_debug_hides_handle_contents() {
        let value = ContextValue::handle(Pool { size: 2 });
        assert_eq!(format!("{value:?}"), "Handle(..)");
    }
}
