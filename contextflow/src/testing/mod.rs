//! Testing utilities for filter chains and context propagation.
//!
//! This module provides:
//! - Recording, short-circuiting and failing filters
//! - A shared call log for asserting execution order
//! - Assertions for [`Action`](crate::core::Action) outcomes

mod assertions;
mod mocks;

pub use assertions::{
    assert_action_error, assert_action_payload, assert_action_success, assert_error_message,
};
pub use mocks::{CallLog, FailingFilter, RecordingFilter, ShortCircuitFilter, SlowFilter};
