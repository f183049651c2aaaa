//! Filter that bounds how long downstream work may take.

use super::{Filter, FilterResult, Next};
use crate::core::{Action, ErrorStatus, MethodMeta};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Default priority: inside error translation, request ids and logging.
pub const TIMEOUT_PRIORITY: i32 = 500;

/// Races the rest of the chain against a timer.
///
/// On expiry the downstream future is dropped and a `Timeout` error action is
/// returned immediately.
#[derive(Debug, Clone)]
pub struct TimeoutFilter {
    timeout: Duration,
    priority: i32,
}

impl TimeoutFilter {
    /// Creates a timeout filter with the default priority.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            priority: TIMEOUT_PRIORITY,
        }
    }

    /// Overrides the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Filter for TimeoutFilter {
    fn name(&self) -> &str {
        "timeout"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn filter(&self, meta: &MethodMeta, next: Next<'_>) -> FilterResult {
        if let Ok(result) = tokio::time::timeout(self.timeout, next.run()).await {
            return result;
        }

        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        warn!(
            operation = %meta.operation,
            timeout_ms,
            "Downstream exceeded timeout"
        );
        Ok(Action::error(
            ErrorStatus::Timeout,
            serde_json::json!({
                "message": format!("{} timed out", meta.operation),
                "timeout_ms": timeout_ms,
            }),
        ))
    }
}
