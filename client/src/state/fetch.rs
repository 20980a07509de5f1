//! Async resource state: `{ data, loading, error }` for one remote call site.
//!
//! ORDERING
//! ========
//! Each load gets a generation number. A result commits only if its
//! generation is still the newest one and the resource has not been torn
//! down, so results land last-dependency-wins rather than last-response-wins.
//! The generation check and the commit happen under the same `watch` write
//! lock as the bump, which keeps check-then-commit atomic across threads.
//!
//! Cancellation is purely logical: a superseded request keeps running and its
//! result is dropped.

#[cfg(test)]
#[path = "fetch_test.rs"]
mod fetch_test;

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ClientError;

/// Observable state of a [`Resource`].
///
/// `loading` implies `error` is `None`, and `data` is only ever set by a
/// successful load. A reload keeps the previous `data` visible until the new
/// result lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchState<T> {
    data: Option<T>,
    loading: bool,
    error: Option<String>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self { data: None, loading: false, error: None }
    }
}

impl<T> FetchState<T> {
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn resolve(&mut self, data: T) {
        self.data = Some(data);
        self.loading = false;
        self.error = None;
    }

    fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }
}

type Producer<D, T> = Arc<dyn Fn(D) -> BoxFuture<'static, Result<T, ClientError>> + Send + Sync>;

struct Shared<D, T> {
    state: watch::Sender<FetchState<T>>,
    generation: AtomicU64,
    torn_down: AtomicBool,
    deps: Mutex<Option<D>>,
}

impl<D, T> Shared<D, T> {
    /// Commit `result` if `generation` is still current. Returns whether it did.
    fn commit(&self, generation: u64, result: Result<T, ClientError>) -> bool {
        let mut result = Some(result);
        self.state.send_if_modified(|state| {
            if self.torn_down.load(Ordering::SeqCst) || self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            match result.take() {
                Some(Ok(data)) => state.resolve(data),
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "resource load failed");
                    state.fail(e.user_message());
                }
                None => return false,
            }
            true
        })
    }
}

/// One call site's remote data. Loads run as tokio tasks; only the newest
/// load may commit.
pub struct Resource<D, T> {
    producer: Producer<D, T>,
    shared: Arc<Shared<D, T>>,
}

impl<D, T> Resource<D, T>
where
    D: Clone + PartialEq + Send + 'static,
    T: Send + Sync + 'static,
{
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn(D) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            producer: Arc::new(move |deps: D| producer(deps).boxed()),
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
                torn_down: AtomicBool::new(false),
                deps: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> FetchState<T>
    where
        T: Clone,
    {
        self.shared.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.shared.torn_down.load(Ordering::SeqCst)
    }

    /// Load for `deps` unless they equal the previous deps. The first call
    /// always loads. Returns the load task, which yields `true` iff its
    /// result was committed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn set_deps(&self, deps: D) -> Option<JoinHandle<bool>> {
        if self.is_torn_down() {
            return None;
        }
        {
            let Ok(mut current) = self.shared.deps.lock() else {
                return None;
            };
            if current.as_ref() == Some(&deps) {
                return None;
            }
            *current = Some(deps.clone());
        }
        Some(self.start(deps))
    }

    /// Load again with the current deps, outside the deps-changed path.
    /// Returns `None` if no deps were ever set or the resource is torn down.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn refetch(&self) -> Option<JoinHandle<bool>> {
        if self.is_torn_down() {
            return None;
        }
        let deps = self.shared.deps.lock().ok()?.clone()?;
        Some(self.start(deps))
    }

    fn start(&self, deps: D) -> JoinHandle<bool> {
        let mut generation = 0;
        self.shared.state.send_modify(|state| {
            generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.begin();
        });
        tracing::trace!(generation, "resource load started");

        let fut = (self.producer)(deps);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let result = fut.await;
            let committed = shared.commit(generation, result);
            if !committed {
                tracing::trace!(generation, "discarded stale resource result");
            }
            committed
        })
    }
}

impl<D, T> Resource<D, T> {
    /// Stop accepting results. In-flight loads finish but never commit.
    pub fn teardown(&self) {
        self.shared.state.send_if_modified(|_| {
            self.shared.torn_down.store(true, Ordering::SeqCst);
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            false
        });
    }
}

impl<D, T> Drop for Resource<D, T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Await a one-off action (admin create/update/delete) and reduce its error
/// to the message a form banner shows.
///
/// # Errors
///
/// Returns [`ClientError::user_message`] of the failure.
pub async fn run_mutation<T, F>(action: F) -> Result<T, String>
where
    F: Future<Output = Result<T, ClientError>>,
{
    action.await.map_err(|e| {
        tracing::warn!(error = %e, "mutation failed");
        e.user_message()
    })
}
