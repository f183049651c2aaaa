//! Test assertions for actions.

use crate::core::{Action, ErrorStatus};

/// Asserts that the action is a success.
pub fn assert_action_success(action: &Action) {
    assert!(
        action.is_success(),
        "Expected success, got: {action:?}"
    );
}

/// Asserts that an action is present and is an error with `expected` status.
pub fn assert_action_error(action: Option<&Action>, expected: ErrorStatus) {
    match action {
        Some(action) => assert_eq!(
            action.error_status(),
            Some(expected),
            "Expected {expected} error, got {action:?}"
        ),
        None => panic!("Expected {expected} error action, got none"),
    }
}

/// Asserts that the action carries the expected payload.
pub fn assert_action_payload(action: &Action, expected: &serde_json::Value) {
    assert_eq!(
        action.payload(),
        expected,
        "Unexpected payload for {:?} action",
        action.kind()
    );
}

/// Asserts that the action's payload has `message` equal to `expected`.
pub fn assert_error_message(action: &Action, expected: &str) {
    let actual = action.payload().get("message").and_then(|m| m.as_str());
    assert_eq!(
        actual,
        Some(expected),
        "Expected error message '{expected}', got {:?}",
        action.payload()
    );
}
