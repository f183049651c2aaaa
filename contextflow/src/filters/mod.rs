//! Filters wrapped around operation handlers.
//!
//! A [`FilterChain`] runs its filters in descending priority order around a
//! final handler. Each filter receives a [`Next`] cursor and either continues
//! the chain or returns an [`Action`](crate::core::Action) on its own.

mod chain;
mod error_translation;
mod logging;
mod registry;
mod request_id;
mod timeout;

pub use chain::{Filter, FilterChain, FilterResult, Next};
pub use error_translation::{ErrorTranslationFilter, ERROR_TRANSLATION_PRIORITY};
pub use logging::{LoggingFilter, LOGGING_PRIORITY};
pub use registry::FilterRegistry;
pub use request_id::{RequestIdFilter, REQUEST_ID_PRIORITY};
pub use timeout::{TimeoutFilter, TIMEOUT_PRIORITY};
