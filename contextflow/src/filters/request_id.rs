//! Filter that guarantees every request carries a correlation id.

use super::{Filter, FilterResult, Next};
use crate::context::{keys, ContextStore};
use crate::core::MethodMeta;
use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

/// Default priority: runs right inside error translation.
pub const REQUEST_ID_PRIORITY: i32 = 900;

/// Stores a generated request id when the inbound request did not carry one.
#[derive(Debug, Clone)]
pub struct RequestIdFilter {
    store: ContextStore,
    key: String,
    priority: i32,
}

impl RequestIdFilter {
    /// Creates the filter using the `x-request-id` key.
    #[must_use]
    pub fn new(store: ContextStore) -> Self {
        Self {
            store,
            key: keys::REQUEST_ID.to_string(),
            priority: REQUEST_ID_PRIORITY,
        }
    }

    /// Uses a different context key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Overrides the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl Filter for RequestIdFilter {
    fn name(&self) -> &str {
        "request_id"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn filter(&self, meta: &MethodMeta, next: Next<'_>) -> FilterResult {
        let present = match self.store.get(&self.key)? {
            None => false,
            Some(value) => match value.as_str() {
                Some(id) => !id.is_empty(),
                None => {
                    warn!(
                        operation = %meta.operation,
                        key = %self.key,
                        "Replacing non-string request id"
                    );
                    false
                }
            },
        };

        if !present {
            let id = Uuid::new_v4();
            debug!(operation = %meta.operation, request_id = %id, "Generated request id");
            self.store.put(self.key.clone(), id)?;
        }

        next.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextValue;
    use crate::core::{Action, HttpMethod};
    use crate::errors::ContextError;
    use crate::filters::FilterChain;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn meta() -> MethodMeta {
        MethodMeta::new("ping", HttpMethod::Get, "/ping")
    }

    fn chain(store: &ContextStore) -> FilterChain {
        FilterChain::build(vec![Arc::new(RequestIdFilter::new(store.clone())) as Arc<dyn Filter>])
    }

    #[tokio::test]
    async fn test_generates_missing_id() {
        let store = ContextStore::new();
        let chain = chain(&store);
        let reader = store.clone();

        let seen = store
            .begin(async {
                chain
                    .execute(&meta(), || async move {
                        let id = reader.request_id()?.unwrap_or_default();
                        Ok(Action::success(serde_json::json!(id)))
                    })
                    .await
            })
            .await;

        let id = seen.ok().and_then(|a| a.payload().as_str().map(str::to_string));
        assert!(id.is_some_and(|id| Uuid::parse_str(&id).is_ok()));
    }

    #[tokio::test]
    async fn test_keeps_inbound_id() {
        let store = ContextStore::new();
        let chain = chain(&store);
        let reader = store.clone();
        let mut seed = HashMap::new();
        seed.insert(keys::REQUEST_ID.to_string(), ContextValue::from("inbound-1"));

        let seen = store
            .begin_with(seed, async {
                chain
                    .execute(&meta(), || async move {
                        Ok(Action::success(serde_json::json!(reader.request_id()?)))
                    })
                    .await
            })
            .await;

        assert_eq!(
            seen.ok(),
            Some(Action::success(serde_json::json!("inbound-1")))
        );
    }

    #[tokio::test]
    async fn test_non_string_id_is_replaced() {
        for inbound in [ContextValue::from(42_i64), ContextValue::handle(7_u8)] {
            let store = ContextStore::new();
            let chain = chain(&store);
            let reader = store.clone();
            let mut seed = HashMap::new();
            seed.insert(keys::REQUEST_ID.to_string(), inbound);

            let seen = store
                .begin_with(seed, async {
                    chain
                        .execute(&meta(), || async move {
                            Ok(Action::success(serde_json::json!(reader.request_id()?)))
                        })
                        .await
                })
                .await;

            let id = seen.ok().and_then(|a| a.payload().as_str().map(str::to_string));
            assert!(id.is_some_and(|id| Uuid::parse_str(&id).is_ok()));
        }
    }

    #[tokio::test]
    async fn test_outside_scope_is_a_programming_error() {
        let store = ContextStore::new();
        let result = chain(&store)
            .execute(&meta(), || async { Ok(Action::empty()) })
            .await;

        let err = result.err();
        assert_eq!(
            err.as_ref().and_then(|e| e.downcast_ref::<ContextError>()),
            Some(&ContextError::NoActiveContext { operation: "get" })
        );
    }
}
