//! Per-request glue between the context store and the filter chain.

use crate::config::DispatchConfig;
use crate::context::{keys, ContextStore, ContextValue};
use crate::core::MethodMeta;
use crate::errors::ConfigError;
use crate::filters::{
    ErrorTranslationFilter, Filter, FilterChain, FilterResult, LoggingFilter, RequestIdFilter,
    TimeoutFilter,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Builds the built-in filters described by `config`.
///
/// Error translation, request ids and logging are always present. The
/// timeout filter is added only when a timeout is configured.
#[must_use]
pub fn standard_filters(config: &DispatchConfig, store: &ContextStore) -> Vec<Arc<dyn Filter>> {
    let key = config.request_id_key();
    let mut filters: Vec<Arc<dyn Filter>> = vec![
        Arc::new(ErrorTranslationFilter::new().with_exposed_details(config.expose_error_details)),
        Arc::new(RequestIdFilter::new(store.clone()).with_key(key.clone())),
        Arc::new(LoggingFilter::new(store.clone()).with_key(key)),
    ];
    if let Some(timeout) = config.timeout() {
        filters.push(Arc::new(TimeoutFilter::new(timeout)));
    }
    filters
}

/// Extracts the propagated headers from inbound request headers.
///
/// Header names are matched case-insensitively and stored under their
/// lowercase form. Everything else is dropped.
pub fn propagated_seed<'h, I>(headers: I) -> HashMap<String, ContextValue>
where
    I: IntoIterator<Item = (&'h str, &'h str)>,
{
    seed_keeping(headers, |name| keys::PROPAGATED_HEADERS.contains(&name))
}

fn seed_keeping<'h, I>(headers: I, keep: impl Fn(&str) -> bool) -> HashMap<String, ContextValue>
where
    I: IntoIterator<Item = (&'h str, &'h str)>,
{
    headers
        .into_iter()
        .filter_map(|(name, value)| {
            let name = name.to_ascii_lowercase();
            keep(&name).then(|| (name, ContextValue::from(value)))
        })
        .collect()
}

/// Runs each request inside a fresh context scope around a shared chain.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: ContextStore,
    chain: FilterChain,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Assembles a dispatcher from existing parts.
    #[must_use]
    pub const fn new(store: ContextStore, chain: FilterChain, config: DispatchConfig) -> Self {
        Self {
            store,
            chain,
            config,
        }
    }

    /// Builds a dispatcher with the standard filters for `config`.
    pub fn from_config(config: DispatchConfig) -> Result<Self, ConfigError> {
        Self::with_filters(config, Vec::new())
    }

    /// Builds a dispatcher with the standard filters plus `extra`.
    pub fn with_filters<I>(config: DispatchConfig, extra: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Arc<dyn Filter>>,
    {
        config.validate()?;

        let store = match config.max_context_entries {
            Some(max) => ContextStore::new().with_max_entries(max),
            None => ContextStore::new(),
        };
        let mut filters = standard_filters(&config, &store);
        filters.extend(extra);
        let chain = FilterChain::build(filters);

        info!(filters = ?chain.names(), timeout_ms = ?config.timeout_ms, "Dispatcher ready");
        Ok(Self::new(store, chain, config))
    }

    /// Extracts the propagated headers plus the configured request id header.
    pub fn seed<'h, I>(&self, headers: I) -> HashMap<String, ContextValue>
    where
        I: IntoIterator<Item = (&'h str, &'h str)>,
    {
        let request_id = self.config.request_id_key();
        seed_keeping(headers, |name| {
            name == request_id || keys::PROPAGATED_HEADERS.contains(&name)
        })
    }

    /// Runs `handler` through the chain inside a new scope seeded with `seed`.
    ///
    /// The scope is discarded when the returned future completes.
    pub async fn dispatch<H, Fut>(
        &self,
        meta: &MethodMeta,
        seed: HashMap<String, ContextValue>,
        handler: H,
    ) -> FilterResult
    where
        H: FnOnce() -> Fut + Send,
        Fut: Future<Output = FilterResult> + Send,
    {
        self.store
            .begin_with(seed, self.chain.execute(meta, handler))
            .await
    }

    /// Returns the store handlers should read request state from.
    #[must_use]
    pub const fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Returns the chain every request runs through.
    #[must_use]
    pub const fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// Returns the configuration the dispatcher was built from.
    #[must_use]
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }
}
