//! Request-scoped context management.
//!
//! This module provides:
//! - A task-local key/value store that follows one unit of work across awaits
//! - Immutable snapshots for replaying the store on another scheduling turn
//! - Values that hold either JSON data or shared dependency handles

pub mod keys;
mod snapshot;
mod store;
mod value;

pub use snapshot::ContextSnapshot;
pub use store::ContextStore;
pub(crate) use store::{capture_ambient, install, install_sync};
pub use value::ContextValue;
