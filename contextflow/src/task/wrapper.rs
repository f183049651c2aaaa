//! A future that carries its context snapshot with it.

use crate::context::{capture_ambient, install, install_sync, ContextSnapshot};
use crate::errors::TaskError;
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::task::{Context, Poll};

/// An asynchronous computation that always runs inside the context scope
/// that was active when it was created.
///
/// Every combinator takes a fresh snapshot when it is registered and replays
/// it when the continuation fires, so a continuation observes the store as it
/// was at registration even when the task is polled from another request's
/// scope, from a spawned task, or from no scope at all.
///
/// Panics inside the computation or any continuation are caught and surface
/// as [`TaskError::Panicked`].
pub struct ContextTask<T> {
    inner: BoxFuture<'static, Result<T, TaskError>>,
    captured: ContextSnapshot,
}

impl<T: Send + 'static> ContextTask<T> {
    /// Wraps `fut`, capturing the ambient context now.
    pub fn new<F, E>(fut: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<TaskError>,
    {
        Self::with_snapshot(capture_ambient(), fut)
    }

    /// Wraps `fut` so that it runs inside `snapshot`.
    pub fn with_snapshot<F, E>(snapshot: ContextSnapshot, fut: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<TaskError>,
    {
        let inner = install(
            snapshot.clone(),
            guard(async move { fut.await.map_err(Into::<TaskError>::into) }),
        )
        .boxed();
        Self {
            inner,
            captured: snapshot,
        }
    }

    /// A task that is already complete.
    pub fn ready(value: T) -> Self {
        Self::new(future::ready(Ok::<T, TaskError>(value)))
    }

    /// A task that has already failed.
    pub fn failed(error: impl Into<TaskError>) -> Self {
        Self::new(future::ready(Err::<T, TaskError>(error.into())))
    }

    /// A task that is already settled with `result`.
    pub fn from_result<E: Into<TaskError>>(result: Result<T, E>) -> Self {
        Self::new(future::ready(result.map_err(Into::<TaskError>::into)))
    }

    /// Waits for every task, yielding results in input order.
    ///
    /// The first failure fails the combined task; the remaining tasks are
    /// dropped.
    pub fn all<I>(tasks: I) -> ContextTask<Vec<T>>
    where
        I: IntoIterator<Item = Self>,
    {
        let tasks: Vec<Self> = tasks.into_iter().collect();
        ContextTask::new(future::try_join_all(tasks))
    }

    /// Settles with whichever task settles first, success or failure.
    pub fn first<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let tasks: Vec<Self> = tasks.into_iter().collect();
        if tasks.is_empty() {
            return Self::failed(TaskError::NoTasks);
        }
        Self::new(async move {
            let (result, _index, _rest) = future::select_all(tasks).await;
            result
        })
    }

    /// Returns the snapshot this task runs under.
    #[must_use]
    pub const fn captured(&self) -> &ContextSnapshot {
        &self.captured
    }

    /// Transforms the success value.
    pub fn map<U, F>(self, f: F) -> ContextTask<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let snapshot = capture_ambient();
        let inner = self.inner;
        ContextTask::chained(snapshot.clone(), async move {
            let value = inner.await?;
            run_restored(snapshot, move || f(value))
        })
    }

    /// Chains another asynchronous step after a success.
    ///
    /// `f` and the future it returns both run inside the snapshot captured
    /// here, so any further tasks they create inherit it.
    pub fn and_then<U, E, F, Fut>(self, f: F) -> ContextTask<U>
    where
        U: Send + 'static,
        E: Into<TaskError>,
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
    {
        let snapshot = capture_ambient();
        let inner = self.inner;
        ContextTask::chained(snapshot.clone(), async move {
            let value = inner.await?;
            install(
                snapshot,
                guard(async move { f(value).await.map_err(Into::<TaskError>::into) }),
            )
            .await
        })
    }

    /// Handles both outcomes, allowing recovery from failures.
    pub fn handle<U, E, F>(self, f: F) -> ContextTask<U>
    where
        U: Send + 'static,
        E: Into<TaskError>,
        F: FnOnce(Result<T, TaskError>) -> Result<U, E> + Send + 'static,
    {
        let snapshot = capture_ambient();
        let inner = self.inner;
        ContextTask::chained(snapshot.clone(), async move {
            let result = inner.await;
            run_restored(snapshot, move || f(result).map_err(Into::<TaskError>::into))?
        })
    }

    /// Transforms a failure; success values pass through untouched.
    pub fn map_err<E, F>(self, f: F) -> Self
    where
        E: Into<TaskError>,
        F: FnOnce(TaskError) -> E + Send + 'static,
    {
        let snapshot = capture_ambient();
        let inner = self.inner;
        Self::chained(snapshot.clone(), async move {
            match inner.await {
                Ok(value) => Ok(value),
                Err(err) => Err(run_restored(snapshot, move || Into::<TaskError>::into(f(err)))?),
            }
        })
    }

    /// Observes the success value without changing it.
    pub fn inspect<F>(self, f: F) -> Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        let snapshot = capture_ambient();
        let inner = self.inner;
        Self::chained(snapshot.clone(), async move {
            let value = inner.await?;
            run_restored(snapshot, move || {
                f(&value);
                value
            })
        })
    }

    /// Runs `f` once the task settles, on both paths.
    ///
    /// The original outcome is kept unless `f` itself panics.
    pub fn finally<F>(self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let snapshot = capture_ambient();
        let inner = self.inner;
        Self::chained(snapshot.clone(), async move {
            let result = inner.await;
            run_restored(snapshot, f)?;
            result
        })
    }

    /// Moves the task onto the tokio runtime.
    ///
    /// Must be called from within a runtime. The spawned future keeps its own
    /// snapshot, so the context survives the hop to another worker.
    pub fn spawn(self) -> Self {
        let captured = self.captured.clone();
        let handle = tokio::spawn(self.inner);
        Self {
            inner: async move {
                match handle.await {
                    Ok(result) => result,
                    Err(err) if err.is_panic() => Err(TaskError::from_panic(&*err.into_panic())),
                    Err(err) => Err(TaskError::Cancelled(err.to_string())),
                }
            }
            .boxed(),
            captured,
        }
    }

    /// Builds a task from a continuation that installs its own scope.
    fn chained<F>(captured: ContextSnapshot, fut: F) -> Self
    where
        F: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        Self {
            inner: fut.boxed(),
            captured,
        }
    }
}

/// Runs a synchronous continuation inside `snapshot`, converting a panic
/// into a failed outcome.
fn run_restored<R>(snapshot: ContextSnapshot, f: impl FnOnce() -> R) -> Result<R, TaskError> {
    install_sync(snapshot, || std::panic::catch_unwind(AssertUnwindSafe(f)))
        .map_err(|payload| TaskError::from_panic(&*payload))
}

/// Converts a panic while polling `fut` into a failed outcome.
async fn guard<T, F>(fut: F) -> Result<T, TaskError>
where
    F: Future<Output = Result<T, TaskError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(TaskError::from_panic(&*payload)),
    }
}

impl<T> Future for ContextTask<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T> fmt::Debug for ContextTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextTask")
            .field("captured", &self.captured)
            .finish_non_exhaustive()
    }
}
