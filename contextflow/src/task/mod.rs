//! Context-preserving asynchronous computations.
//!
//! [`ContextTask`] snapshots the active context when it is created and when
//! each continuation is registered, and replays the matching snapshot whenever
//! it is polled, so request state survives spawns and foreign schedulers.

mod wrapper;

pub use wrapper::ContextTask;
