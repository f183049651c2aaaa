//! Core value types shared by filters, handlers and the transport boundary.
//!
//! This module contains:
//! - Operation metadata (method, path, declared parameters)
//! - The `Action` outcome type and its error classification

mod action;
mod metadata;

pub use action::{Action, ActionFailure, ActionKind, ErrorStatus};
pub use metadata::{HttpMethod, MethodMeta, ParamSource, ParamSpec};
