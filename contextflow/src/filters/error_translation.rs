//! Filter that turns failures into error actions.

use super::{Filter, FilterResult, Next};
use crate::core::{Action, ActionFailure, ErrorStatus, MethodMeta};
use crate::errors::TaskError;
use async_trait::async_trait;
use tracing::{error, warn};

/// Default priority: high enough to wrap every other built-in filter.
pub const ERROR_TRANSLATION_PRIORITY: i32 = 1000;

/// Catches any failure from downstream and returns an error [`Action`].
///
/// [`ActionFailure`]s keep their requested status. Anything else becomes
/// `Internal`; its message is only exposed when `expose_details` is set.
#[derive(Debug, Clone)]
pub struct ErrorTranslationFilter {
    priority: i32,
    expose_details: bool,
}

impl ErrorTranslationFilter {
    /// Creates the filter with the default priority, hiding internal details.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            priority: ERROR_TRANSLATION_PRIORITY,
            expose_details: false,
        }
    }

    /// Overrides the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Includes internal error messages in error payloads.
    #[must_use]
    pub const fn with_exposed_details(mut self, expose: bool) -> Self {
        self.expose_details = expose;
        self
    }

    /// Maps a failure to the action returned to the caller.
    #[must_use]
    pub fn translate(&self, err: &anyhow::Error) -> Action {
        if let Some(failure) = find_failure(err) {
            return failure.to_action();
        }

        let message = if self.expose_details {
            format!("{err:#}")
        } else {
            "internal error".to_string()
        };
        Action::error_message(ErrorStatus::Internal, message)
    }
}

impl Default for ErrorTranslationFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn find_failure(err: &anyhow::Error) -> Option<&ActionFailure> {
    if let Some(failure) = err.downcast_ref::<ActionFailure>() {
        return Some(failure);
    }
    match err.downcast_ref::<TaskError>() {
        Some(TaskError::Failed(inner)) => find_failure(inner),
        _ => None,
    }
}

#[async_trait]
impl Filter for ErrorTranslationFilter {
    fn name(&self) -> &str {
        "error_translation"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn filter(&self, meta: &MethodMeta, next: Next<'_>) -> FilterResult {
        match next.run().await {
            Ok(action) => Ok(action),
            Err(err) => {
                let action = self.translate(&err);
                if action.error_status() == Some(ErrorStatus::Internal) {
                    error!(
                        operation = %meta.operation,
                        error = %format!("{err:#}"),
                        "Unhandled failure translated to error action"
                    );
                } else {
                    warn!(
                        operation = %meta.operation,
                        status = ?action.error_status(),
                        error = %err,
                        "Failure translated to error action"
                    );
                }
                Ok(action)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HttpMethod;
    use crate::filters::FilterChain;
    use crate::testing::{assert_action_error, CallLog, FailingFilter, RecordingFilter};
    use serde_json::json;
    use std::sync::Arc;

    fn meta() -> MethodMeta {
        MethodMeta::new("users.get", HttpMethod::Get, "/users/{id}")
    }

    #[tokio::test]
    async fn test_passes_success_through() {
        let chain = FilterChain::build(vec![Arc::new(ErrorTranslationFilter::new()) as Arc<dyn Filter>]);
        let result = chain
            .execute(&meta(), || async { Ok(Action::success(json!(1))) })
            .await;
        assert_eq!(result.ok(), Some(Action::success(json!(1))));
    }

    #[tokio::test]
    async fn test_translates_filter_failure_hiding_details() {
        let log = CallLog::new();
        let chain = FilterChain::build(vec![
            Arc::new(RecordingFilter::new("inner", 0, log.clone())) as Arc<dyn Filter>,
            Arc::new(FailingFilter::new("broken", 5, "secret connection string")),
            Arc::new(ErrorTranslationFilter::new()),
        ]);

        let result = chain.execute(&meta(), || async { Ok(Action::empty()) }).await;
        let action = result.ok();
        assert_eq!(
            action,
            Some(Action::error_message(ErrorStatus::Internal, "internal error"))
        );
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_keeps_requested_status() {
        let chain = FilterChain::build(vec![Arc::new(ErrorTranslationFilter::new()) as Arc<dyn Filter>]);
        let result = chain
            .execute(&meta(), || async {
                Err(anyhow::Error::from(ActionFailure::not_found(
                    "user 7 does not exist",
                )))
            })
            .await;

        let action = result.ok();
        assert_action_error(action.as_ref(), ErrorStatus::NotFound);
        assert_eq!(
            action.map(Action::into_payload),
            Some(json!({"message": "user 7 does not exist"}))
        );
    }

    #[test]
    fn test_translate_unwraps_task_errors() {
        let filter = ErrorTranslationFilter::new();
        let err = anyhow::Error::from(TaskError::Failed(ActionFailure::bad_request("bad").into()));
        assert_eq!(filter.translate(&err).error_status(), Some(ErrorStatus::BadRequest));
    }

    #[test]
    fn test_translate_exposes_details_when_enabled() {
        let filter = ErrorTranslationFilter::new().with_exposed_details(true);
        let err = anyhow::anyhow!("disk full").context("writing audit log");
        assert_eq!(
            filter.translate(&err),
            Action::error_message(ErrorStatus::Internal, "writing audit log: disk full")
        );
    }
}
