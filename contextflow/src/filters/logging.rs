//! Filter that wraps each invocation in a tracing span.

use super::{Filter, FilterResult, Next};
use crate::context::{keys, ContextStore};
use crate::core::MethodMeta;
use crate::observability::SpanTimer;
use async_trait::async_trait;
use tracing::{info, info_span, warn, Instrument};

/// Default priority: inside request id generation so the id is available.
pub const LOGGING_PRIORITY: i32 = 800;

/// Logs the start and outcome of every invocation.
///
/// Downstream work runs inside an `invocation` span carrying the operation,
/// method, path and request id, so filters and handlers log with those fields.
#[derive(Debug, Clone)]
pub struct LoggingFilter {
    store: ContextStore,
    key: String,
    priority: i32,
}

impl LoggingFilter {
    /// Creates the filter reading the request id from `x-request-id`.
    #[must_use]
    pub fn new(store: ContextStore) -> Self {
        Self {
            store,
            key: keys::REQUEST_ID.to_string(),
            priority: LOGGING_PRIORITY,
        }
    }

    /// Reads the request id from a different context key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Returns the context key the request id is read from.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Overrides the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl Filter for LoggingFilter {
    fn name(&self) -> &str {
        "logging"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn filter(&self, meta: &MethodMeta, next: Next<'_>) -> FilterResult {
        // Logging must work outside a scope too.
        let request_id = self.store.get_str(&self.key).ok().flatten().unwrap_or_default();
        let span = info_span!(
            "invocation",
            operation = %meta.operation,
            method = %meta.method,
            path = %meta.path,
            request_id = %request_id,
        );

        async move {
            let timer = SpanTimer::start(meta.operation.as_str());
            info!("Invocation started");

            let result = next.run().await;
            let duration_ms = timer.finish();
            match &result {
                Ok(action) => info!(
                    kind = %action.kind(),
                    status_code = action.status_code(),
                    duration_ms,
                    "Invocation completed"
                ),
                Err(err) => warn!(error = %err, duration_ms, "Invocation failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
