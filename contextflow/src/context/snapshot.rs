//! Immutable captures of a context scope.

use super::ContextValue;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// An immutable copy of a context scope's entries at one point in time.
///
/// Snapshots are taken whenever a continuation is registered and replayed
/// with [`ContextStore::restore`](super::ContextStore::restore) when it runs.
/// Mutating the live scope afterwards never changes a snapshot already taken.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    entries: Arc<HashMap<String, ContextValue>>,
    scope_id: Option<Uuid>,
    captured_at: DateTime<Utc>,
    pub(crate) limit: Option<usize>,
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl ContextSnapshot {
    /// Creates a snapshot with no entries and no originating scope.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Arc::new(HashMap::new()),
            scope_id: None,
            captured_at: Utc::now(),
            limit: None,
        }
    }

    /// Creates a snapshot from explicit entries.
    #[must_use]
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ContextValue>,
    {
        Self {
            entries: Arc::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::empty()
        }
    }

    pub(crate) fn capture(
        entries: HashMap<String, ContextValue>,
        scope_id: Uuid,
        limit: Option<usize>,
    ) -> Self {
        Self {
            entries: Arc::new(entries),
            scope_id: Some(scope_id),
            captured_at: Utc::now(),
            limit,
        }
    }

    /// Returns the value stored under `key` at capture time.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    /// Returns true if `key` was present at capture time.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of captured entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the captured keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Iterates over the captured entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the id of the scope the snapshot was taken from.
    #[must_use]
    pub const fn scope_id(&self) -> Option<Uuid> {
        self.scope_id
    }

    /// Returns when the snapshot was taken.
    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Returns a copy of the captured entries.
    #[must_use]
    pub fn to_entries(&self) -> HashMap<String, ContextValue> {
        self.entries.as_ref().clone()
    }

    /// Renders the JSON-valued entries as an object. Handles are omitted.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .filter_map(|(k, v)| v.as_json().map(|json| (k.clone(), json.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Snapshots are equal when they captured the same entries.
impl PartialEq for ContextSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
