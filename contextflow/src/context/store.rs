//! The request-scoped context store.
//!
//! Each unit of work runs inside a scope installed with `tokio::task_local!`.
//! The scope travels with the future that owns it, so every `.await` inside
//! that future (and every nested future it polls) sees the same entries, no
//! matter which worker thread resumes it. Futures spawned elsewhere do not
//! inherit the scope; they must carry a [`ContextSnapshot`] explicitly, which
//! is what [`ContextTask`](crate::task::ContextTask) does.

use super::keys;
use super::{ContextSnapshot, ContextValue};
use crate::errors::ContextError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

tokio::task_local! {
    static ACTIVE_SCOPE: Arc<Scope>;
}

/// The live entries of one unit of work.
struct Scope {
    id: Uuid,
    created_at: DateTime<Utc>,
    limit: Option<usize>,
    /// Entry count `put` may grow the scope to: what it was opened with plus `limit`.
    capacity: Option<usize>,
    entries: RwLock<HashMap<String, ContextValue>>,
}

impl Scope {
    fn new(id: Uuid, entries: HashMap<String, ContextValue>, limit: Option<usize>) -> Arc<Self> {
        let capacity = limit.map(|limit| limit.saturating_add(entries.len()));
        Arc::new(Self {
            id,
            created_at: Utc::now(),
            limit,
            capacity,
            entries: RwLock::new(entries),
        })
    }

    fn from_snapshot(snapshot: ContextSnapshot, fallback_limit: Option<usize>) -> Arc<Self> {
        let id = snapshot.scope_id().unwrap_or_else(Uuid::new_v4);
        let limit = snapshot.limit.or(fallback_limit);
        Self::new(id, snapshot.to_entries(), limit)
    }

    fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot::capture(self.entries.read().clone(), self.id, self.limit)
    }
}

fn with_scope<R>(
    operation: &'static str,
    f: impl FnOnce(&Scope) -> R,
) -> Result<R, ContextError> {
    ACTIVE_SCOPE
        .try_with(|scope| f(scope.as_ref()))
        .map_err(|_| ContextError::NoActiveContext { operation })
}

/// Captures the ambient scope, or an empty snapshot when none is active.
pub(crate) fn capture_ambient() -> ContextSnapshot {
    ACTIVE_SCOPE
        .try_with(|scope| scope.snapshot())
        .unwrap_or_else(|_| ContextSnapshot::empty())
}

/// Runs `task` with `snapshot` installed as the active scope.
pub(crate) fn install<F: Future>(
    snapshot: ContextSnapshot,
    task: F,
) -> impl Future<Output = F::Output> {
    ACTIVE_SCOPE.scope(Scope::from_snapshot(snapshot, None), task)
}

/// Runs `f` synchronously with `snapshot` installed as the active scope.
pub(crate) fn install_sync<R>(snapshot: ContextSnapshot, f: impl FnOnce() -> R) -> R {
    ACTIVE_SCOPE.sync_scope(Scope::from_snapshot(snapshot, None), f)
}

/// Handle to the request-scoped key/value store.
///
/// The store is a constructed component; the transport boundary creates one
/// and hands clones to whatever needs to read or write request state. All
/// clones address whichever scope is active for the calling task.
///
/// ```rust,ignore
/// let store = ContextStore::new();
/// let action = store
///     .begin(async {
///         store.put("x-tenant-id", "acme")?;
///         chain.execute(&meta, handler).await
///     })
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    max_entries: Option<usize>,
}

impl ContextStore {
    /// Creates a store with no entry limit.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_entries: None }
    }

    /// Limits how many entries `put` may add to a scope created by this store.
    ///
    /// Entries a scope is opened with (a `begin_with` seed or a restored
    /// snapshot) do not count against the limit.
    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Returns the configured entry limit.
    #[must_use]
    pub const fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Runs `task` inside a brand-new, empty scope.
    ///
    /// Nested calls are legal: the inner task sees its own empty scope and the
    /// outer scope becomes visible again once the inner task finishes.
    pub fn begin<F: Future>(&self, task: F) -> impl Future<Output = F::Output> {
        self.begin_with(HashMap::new(), task)
    }

    /// Runs `task` inside a new scope pre-populated with `seed`.
    pub fn begin_with<F: Future>(
        &self,
        seed: HashMap<String, ContextValue>,
        task: F,
    ) -> impl Future<Output = F::Output> {
        let scope = Scope::new(Uuid::new_v4(), seed, self.max_entries);
        debug!(scope_id = %scope.id, entries = scope.entries.read().len(), "Context scope opened");
        ACTIVE_SCOPE.scope(scope, task)
    }

    /// Runs `f` synchronously inside a brand-new, empty scope.
    pub fn begin_sync<R>(&self, f: impl FnOnce() -> R) -> R {
        ACTIVE_SCOPE.sync_scope(Scope::new(Uuid::new_v4(), HashMap::new(), self.max_entries), f)
    }

    /// Returns true if the calling task has an active scope.
    #[must_use]
    pub fn is_active(&self) -> bool {
        ACTIVE_SCOPE.try_with(|_| ()).is_ok()
    }

    /// Returns the id of the active scope.
    pub fn scope_id(&self) -> Result<Uuid, ContextError> {
        with_scope("scope_id", |scope| scope.id)
    }

    /// Returns when the active scope was opened or restored.
    pub fn opened_at(&self) -> Result<DateTime<Utc>, ContextError> {
        with_scope("opened_at", |scope| scope.created_at)
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn put(
        &self,
        key: impl Into<String>,
        value: impl Into<ContextValue>,
    ) -> Result<Option<ContextValue>, ContextError> {
        let key = key.into();
        let value = value.into();
        with_scope("put", |scope| {
            let mut entries = scope.entries.write();
            if let Some(limit) = scope.capacity {
                if entries.len() >= limit && !entries.contains_key(&key) {
                    return Err(ContextError::CapacityExceeded { key, limit });
                }
            }
            Ok(entries.insert(key, value))
        })?
    }

    /// Stores a dependency handle under `key`.
    pub fn put_handle<T: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        handle: Arc<T>,
    ) -> Result<Option<ContextValue>, ContextError> {
        self.put(key, ContextValue::from_arc(handle))
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<Option<ContextValue>, ContextError> {
        with_scope("get", |scope| scope.entries.read().get(key).cloned())
    }

    /// Returns the JSON value stored under `key`.
    pub fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, ContextError> {
        match self.get(key)? {
            None => Ok(None),
            Some(ContextValue::Json(value)) => Ok(Some(value)),
            Some(ContextValue::Handle(_)) => Err(ContextError::TypeMismatch {
                key: key.to_string(),
                expected: "JSON value",
            }),
        }
    }

    /// Returns the string stored under `key`.
    pub fn get_str(&self, key: &str) -> Result<Option<String>, ContextError> {
        match self.get_value(key)? {
            None => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ContextError::TypeMismatch {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }

    /// Returns the handle of type `T` stored under `key`.
    pub fn get_handle<T: Any + Send + Sync>(
        &self,
        key: &str,
    ) -> Result<Option<Arc<T>>, ContextError> {
        match self.get(key)? {
            None => Ok(None),
            Some(value) => value.downcast::<T>().map(Some).ok_or_else(|| {
                ContextError::TypeMismatch {
                    key: key.to_string(),
                    expected: std::any::type_name::<T>(),
                }
            }),
        }
    }

    /// Returns true if `key` is present.
    pub fn contains(&self, key: &str) -> Result<bool, ContextError> {
        with_scope("contains", |scope| scope.entries.read().contains_key(key))
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &str) -> Result<Option<ContextValue>, ContextError> {
        with_scope("remove", |scope| scope.entries.write().remove(key))
    }

    /// Removes every entry from the active scope.
    pub fn clear(&self) -> Result<(), ContextError> {
        with_scope("clear", |scope| scope.entries.write().clear())
    }

    /// Returns the keys of the active scope in sorted order.
    pub fn keys(&self) -> Result<Vec<String>, ContextError> {
        with_scope("keys", |scope| {
            let mut keys: Vec<String> = scope.entries.read().keys().cloned().collect();
            keys.sort_unstable();
            keys
        })
    }

    /// Returns the number of entries in the active scope.
    pub fn len(&self) -> Result<usize, ContextError> {
        with_scope("len", |scope| scope.entries.read().len())
    }

    /// Returns true if the active scope has no entries.
    pub fn is_empty(&self) -> Result<bool, ContextError> {
        self.len().map(|len| len == 0)
    }

    /// Captures the entries of the active scope.
    pub fn snapshot(&self) -> Result<ContextSnapshot, ContextError> {
        with_scope("snapshot", Scope::snapshot)
    }

    /// Runs `task` with `snapshot` installed as the active scope.
    ///
    /// The task works on its own copy of the captured entries. Whatever was
    /// active before is visible again once `task` finishes, unwinds, or is
    /// dropped.
    pub fn restore<F: Future>(
        &self,
        snapshot: ContextSnapshot,
        task: F,
    ) -> impl Future<Output = F::Output> {
        ACTIVE_SCOPE.scope(Scope::from_snapshot(snapshot, self.max_entries), task)
    }

    /// Runs `f` synchronously with `snapshot` installed as the active scope.
    pub fn restore_sync<R>(&self, snapshot: ContextSnapshot, f: impl FnOnce() -> R) -> R {
        ACTIVE_SCOPE.sync_scope(Scope::from_snapshot(snapshot, self.max_entries), f)
    }

    /// Returns the propagated request id, if one was set.
    pub fn request_id(&self) -> Result<Option<String>, ContextError> {
        self.get_str(keys::REQUEST_ID)
    }

    /// Returns the propagated tenant id, if one was set.
    pub fn tenant_id(&self) -> Result<Option<String>, ContextError> {
        self.get_str(keys::TENANT_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_outside_scope_fail() {
        let store = ContextStore::new();
        assert!(!store.is_active());
        assert_eq!(
            store.put("k", "v"),
            Err(ContextError::NoActiveContext { operation: "put" })
        );
        assert_eq!(
            store.get("k"),
            Err(ContextError::NoActiveContext { operation: "get" })
        );
        assert!(store.snapshot().is_err());
        assert!(store.clear().is_err());
    }

    #[test]
    fn test_put_get_remove_sync() {
        let store = ContextStore::new();
        store.begin_sync(|| {
            assert!(store.is_active());
            assert_eq!(store.put("tenant", "A"), Ok(None));
            assert_eq!(store.get_str("tenant"), Ok(Some("A".to_string())));
            assert_eq!(
                store.put("tenant", "B"),
                Ok(Some(ContextValue::from("A")))
            );
            assert_eq!(store.remove("tenant"), Ok(Some(ContextValue::from("B"))));
            assert_eq!(store.get("tenant"), Ok(None));
        });
    }

    #[test]
    fn test_clear_and_len() {
        let store = ContextStore::new();
        store.begin_sync(|| {
            store.put("a", 1_i64).ok();
            store.put("b", 2_i64).ok();
            assert_eq!(store.len(), Ok(2));
            assert_eq!(store.keys(), Ok(vec!["a".to_string(), "b".to_string()]));
            store.clear().ok();
            assert_eq!(store.is_empty(), Ok(true));
        });
    }

    #[test]
    fn test_type_mismatch() {
        let store = ContextStore::new();
        store.begin_sync(|| {
            store.put("count", 3_i64).ok();
            store.put_handle("pool", Arc::new(5_u8)).ok();

            assert!(matches!(
                store.get_str("count"),
                Err(ContextError::TypeMismatch { .. })
            ));
            assert!(matches!(
                store.get_value("pool"),
                Err(ContextError::TypeMismatch { .. })
            ));
            assert!(matches!(
                store.get_handle::<String>("pool"),
                Err(ContextError::TypeMismatch { .. })
            ));
            assert_eq!(store.get_handle::<u8>("pool").ok().flatten().as_deref(), Some(&5));
        });
    }

    #[test]
    fn test_capacity_limit() {
        let store = ContextStore::new().with_max_entries(1);
        store.begin_sync(|| {
            assert!(store.put("a", "1").is_ok());
            assert!(store.put("a", "2").is_ok());
            assert_eq!(
                store.put("b", "3"),
                Err(ContextError::CapacityExceeded {
                    key: "b".to_string(),
                    limit: 1,
                })
            );
        });
    }

    #[test]
    fn test_seeded_entries_do_not_count_against_limit() {
        let store = ContextStore::new().with_max_entries(1);
        let mut seed = HashMap::new();
        seed.insert("x-tenant-id".to_string(), ContextValue::from("acme"));
        seed.insert("traceparent".to_string(), ContextValue::from("00-ab-cd-01"));

        let (first, second, restored) = tokio_test::block_on(store.begin_with(seed, async {
            let first = store.put("x-request-id", "r-1");
            let second = store.put("extra", "nope");
            let snapshot = store.snapshot().ok().unwrap_or_default();
            let restored = store.restore_sync(snapshot, || store.put("after-restore", "ok"));
            (first, second, restored)
        }));

        assert_eq!(first, Ok(None));
        assert_eq!(
            second,
            Err(ContextError::CapacityExceeded {
                key: "extra".to_string(),
                limit: 3,
            })
        );
        assert_eq!(restored, Ok(None));
    }

    #[test]
    fn test_restore_sync_installs_copy() {
        let store = ContextStore::new();
        store.begin_sync(|| {
            store.put("tenant", "A").ok();
            let snapshot = store.snapshot().ok().unwrap_or_default();
            let origin = store.scope_id().ok();

            store.restore_sync(snapshot, || {
                assert_eq!(store.scope_id().ok(), origin);
                store.put("tenant", "changed").ok();
            });

            assert_eq!(store.get_str("tenant"), Ok(Some("A".to_string())));
        });
    }

    #[test]
    fn test_request_and_tenant_helpers() {
        let store = ContextStore::new();
        store.begin_sync(|| {
            store.put(keys::REQUEST_ID, "req-1").ok();
            store.put(keys::TENANT_ID, "acme").ok();
            assert_eq!(store.request_id(), Ok(Some("req-1".to_string())));
            assert_eq!(store.tenant_id(), Ok(Some("acme".to_string())));
        });
    }
}
