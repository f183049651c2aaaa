//! Mock filters for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{Action, MethodMeta};
use crate::filters::{Filter, FilterResult, Next};

/// Ordered log shared between filters and handlers under test.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: &str) {
        self.entries.lock().push(entry.to_string());
    }

    /// Returns a copy of every entry so far.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// A filter that records `name` before and `name:after` after the rest of
/// the chain.
///
/// Downstream failures are propagated with `?`, so the after entry is only
/// written on success.
#[derive(Debug)]
pub struct RecordingFilter {
    name: String,
    priority: i32,
    log: CallLog,
}

impl RecordingFilter {
    /// Creates a new recording filter.
    #[must_use]
    pub fn new(name: &str, priority: i32, log: CallLog) -> Self {
        Self {
            name: name.to_string(),
            priority,
            log,
        }
    }
}

#[async_trait]
impl Filter for RecordingFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn filter(&self, _meta: &MethodMeta, next: Next<'_>) -> FilterResult {
        self.log.record(&self.name);
        let action = next.run().await?;
        self.log.record(&format!("{}:after", self.name));
        Ok(action)
    }
}

/// A filter that returns a fixed action without calling `next`.
#[derive(Debug)]
pub struct ShortCircuitFilter {
    name: String,
    priority: i32,
    action: Action,
    log: CallLog,
}

impl ShortCircuitFilter {
    /// Creates a new short-circuiting filter.
    #[must_use]
    pub fn new(name: &str, priority: i32, action: Action, log: CallLog) -> Self {
        Self {
            name: name.to_string(),
            priority,
            action,
            log,
        }
    }
}

#[async_trait]
impl Filter for ShortCircuitFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn filter(&self, _meta: &MethodMeta, _next: Next<'_>) -> FilterResult {
        self.log.record(&self.name);
        Ok(self.action.clone())
    }
}

/// A filter that always fails with the given message.
#[derive(Debug)]
pub struct FailingFilter {
    name: String,
    priority: i32,
    message: String,
}

impl FailingFilter {
    /// Creates a new failing filter.
    #[must_use]
    pub fn new(name: &str, priority: i32, message: &str) -> Self {
        Self {
            name: name.to_string(),
            priority,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Filter for FailingFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn filter(&self, _meta: &MethodMeta, _next: Next<'_>) -> FilterResult {
        Err(anyhow::anyhow!("{}", self.message))
    }
}

/// A filter that sleeps before continuing the chain.
#[derive(Debug)]
pub struct SlowFilter {
    name: String,
    priority: i32,
    delay: Duration,
}

impl SlowFilter {
    /// Creates a new slow filter.
    #[must_use]
    pub fn new(name: &str, priority: i32, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            priority,
            delay,
        }
    }
}

#[async_trait]
impl Filter for SlowFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn filter(&self, _meta: &MethodMeta, next: Next<'_>) -> FilterResult {
        tokio::time::sleep(self.delay).await;
        next.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HttpMethod;
    use crate::filters::FilterChain;

    #[test]
    fn test_call_log() {
        let log = CallLog::new();
        let shared = log.clone();
        shared.record("a");
        log.record("b");
        assert_eq!(log.entries(), vec!["a", "b"]);
        log.clear();
        assert!(shared.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_filter_delays_chain() {
        let chain = FilterChain::build(vec![
            Arc::new(SlowFilter::new("slow", 0, Duration::from_millis(200))) as Arc<dyn Filter>,
        ]);
        let meta = MethodMeta::new("ping", HttpMethod::Get, "/ping");
        let started = tokio::time::Instant::now();

        let result = chain.execute(&meta, || async { Ok(Action::empty()) }).await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
