//! Priority-ordered filter chain execution.

use crate::core::{Action, MethodMeta};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// Outcome of a filter or final handler.
///
/// An `Err` travels up the chain unchanged until some filter chooses to turn
/// it into an error [`Action`].
pub type FilterResult = anyhow::Result<Action>;

/// A unit of cross-cutting behavior wrapped around the final handler.
#[async_trait]
pub trait Filter: Send + Sync {
    /// Name used in logs and for unregistering.
    fn name(&self) -> &str;

    /// Returns the filter's priority (higher = earlier execution).
    fn priority(&self) -> i32 {
        0
    }

    /// Runs the filter.
    ///
    /// Call `next.run().await` to invoke the rest of the chain, or return an
    /// `Action` without calling it to short-circuit.
    async fn filter(&self, meta: &MethodMeta, next: Next<'_>) -> FilterResult;
}

type FinalHandler<'a> = Box<dyn FnOnce() -> BoxFuture<'a, FilterResult> + Send + 'a>;

/// Cursor over the remainder of one chain execution.
///
/// Consumed by [`Next::run`], so the rest of the chain runs at most once per
/// filter invocation.
pub struct Next<'a> {
    filters: &'a [Arc<dyn Filter>],
    index: usize,
    meta: &'a MethodMeta,
    handler: FinalHandler<'a>,
}

impl<'a> Next<'a> {
    fn new(filters: &'a [Arc<dyn Filter>], meta: &'a MethodMeta, handler: FinalHandler<'a>) -> Self {
        Self {
            filters,
            index: 0,
            meta,
            handler,
        }
    }

    /// Invokes the next filter, or the final handler once filters run out.
    pub async fn run(self) -> FilterResult {
        let Self {
            filters,
            index,
            meta,
            handler,
        } = self;

        match filters.get(index) {
            Some(filter) => {
                debug!(
                    operation = %meta.operation,
                    filter = filter.name(),
                    position = index,
                    "Entering filter"
                );
                let next = Self {
                    filters,
                    index: index + 1,
                    meta,
                    handler,
                };
                filter.filter(meta, next).await
            }
            None => {
                debug!(operation = %meta.operation, "Invoking final handler");
                handler().await
            }
        }
    }

    /// Position of the filter this cursor will invoke.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.index
    }

    /// Number of filters left before the final handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.filters.len().saturating_sub(self.index)
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("operation", &self.meta.operation)
            .field("index", &self.index)
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

/// An immutable, priority-sorted pipeline of filters.
///
/// Built once and reused for any number of executions; each execution gets its
/// own [`Next`] cursor. Cloning is cheap.
#[derive(Clone)]
pub struct FilterChain {
    filters: Arc<[Arc<dyn Filter>]>,
}

impl FilterChain {
    /// Builds a chain, sorting by priority descending.
    ///
    /// The sort is stable: filters with equal priority keep their
    /// registration order.
    pub fn build<I>(filters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Filter>>,
    {
        let mut filters: Vec<Arc<dyn Filter>> = filters.into_iter().collect();
        filters.sort_by_key(|f| std::cmp::Reverse(f.priority()));
        Self {
            filters: filters.into(),
        }
    }

    /// A chain with no filters; `execute` calls the handler directly.
    #[must_use]
    pub fn empty() -> Self {
        Self::build(Vec::new())
    }

    /// Runs the chain around `handler`.
    ///
    /// Failures from filters or the handler are returned unchanged.
    pub async fn execute<'a, H, Fut>(&'a self, meta: &'a MethodMeta, handler: H) -> FilterResult
    where
        H: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = FilterResult> + Send + 'a,
    {
        let handler: FinalHandler<'a> = Box::new(move || handler().boxed());
        let result = Next::new(&self.filters, meta, handler).run().await;

        if let Err(err) = &result {
            error!(
                operation = %meta.operation,
                error = %err,
                "Filter chain failed without translation"
            );
        }
        result
    }

    /// Returns the filters in execution order.
    #[must_use]
    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    /// Returns filter names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Returns the number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| (filter.name(), filter.priority())))
            .finish()
    }
}
