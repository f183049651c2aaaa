//! # Contextflow
//!
//! Request-scoped context propagation and prioritized filter chains for async
//! request handling.
//!
//! Contextflow provides:
//!
//! - **Context store**: a per-request key/value scope that follows the request
//!   across `.await` points and worker threads, isolated from every other
//!   concurrent request
//! - **Context-preserving tasks**: futures whose continuations run under the
//!   context that was active when they were registered
//! - **Filter chains**: priority-ordered, short-circuiting interceptors around a
//!   final handler
//! - **Dispatch**: the glue that opens a scope per request and runs the chain
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use contextflow::prelude::*;
//!
//! let dispatcher = Dispatcher::from_config(DispatchConfig::from_env()?)?;
//! let store = dispatcher.store().clone();
//! let meta = MethodMeta::new("users.get", HttpMethod::Get, "/users/{id}");
//!
//! let action = dispatcher
//!     .dispatch(&meta, propagated_seed(headers), || async move {
//!         let tenant = store.tenant_id()?;
//!         Ok(Action::success(serde_json::json!({ "tenant": tenant })))
//!     })
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod dispatch;
pub mod errors;
pub mod filters;
pub mod observability;
pub mod task;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::DispatchConfig;
    pub use crate::context::{keys, ContextSnapshot, ContextStore, ContextValue};
    pub use crate::core::{
        Action, ActionFailure, ActionKind, ErrorStatus, HttpMethod, MethodMeta, ParamSource,
        ParamSpec,
    };
    pub use crate::dispatch::{propagated_seed, standard_filters, Dispatcher};
    pub use crate::errors::{ConfigError, ContextError, TaskError};
    pub use crate::filters::{
        ErrorTranslationFilter, Filter, FilterChain, FilterRegistry, FilterResult,
        LoggingFilter, Next, RequestIdFilter, TimeoutFilter,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::task::ContextTask;
}
