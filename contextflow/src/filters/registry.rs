//! Mutable registration of filters, frozen into chains on demand.

use super::{Filter, FilterChain};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Collects filters over the lifetime of an application.
///
/// [`FilterRegistry::build`] takes a snapshot of the current registrations,
/// so chains already built (and executions already in flight) are unaffected
/// by later changes.
#[derive(Default)]
pub struct FilterRegistry {
    filters: RwLock<Vec<Arc<dyn Filter>>>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a filter after all existing registrations.
    pub fn register(&self, filter: Arc<dyn Filter>) {
        debug!(filter = filter.name(), priority = filter.priority(), "Filter registered");
        self.filters.write().push(filter);
    }

    /// Registers several filters in order.
    pub fn register_all<I>(&self, filters: I)
    where
        I: IntoIterator<Item = Arc<dyn Filter>>,
    {
        for filter in filters {
            self.register(filter);
        }
    }

    /// Removes every filter named `name`. Returns how many were removed.
    pub fn unregister(&self, name: &str) -> usize {
        let mut filters = self.filters.write();
        let before = filters.len();
        filters.retain(|f| f.name() != name);
        before - filters.len()
    }

    /// Builds a chain from the current registrations.
    #[must_use]
    pub fn build(&self) -> FilterChain {
        FilterChain::build(self.filters.read().iter().cloned())
    }

    /// Returns the registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.filters.read().iter().map(|f| f.name().to_string()).collect()
    }

    /// Returns the number of registered filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.read().is_empty()
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}
