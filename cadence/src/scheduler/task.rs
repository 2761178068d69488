//! Explicit ownership handles for background work and host subscriptions.

use std::fmt;
use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a spawned background task.
///
/// Holds the task's cancellation token and its completion signal. The task
/// body receives a clone of the token and is expected to exit promptly once
/// it fires. Dropping the handle cancels the task.
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl TaskHandle {
    /// Spawn `body` on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, like `tokio::spawn`.
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let join = tokio::spawn(body(token.clone()));
        tracing::trace!(task = name, "Task spawned");
        Self {
            name,
            token,
            join: Mutex::new(Some(join)),
        }
    }

    /// Name used in log output.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Request cancellation.
    ///
    /// Returns `true` only for the call that actually cancelled the task.
    pub fn cancel(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        tracing::trace!(task = self.name, "Task cancelled");
        true
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A clone of the token the task body watches.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the task body has returned.
    pub fn is_finished(&self) -> bool {
        self.join
            .lock()
            .as_ref()
            .map(|join| join.is_finished())
            .unwrap_or(true)
    }

    /// Wait for the task body to return.
    ///
    /// Only the first caller actually waits; later calls return immediately.
    pub async fn join(&self) {
        let join = self.join.lock().take();
        if let Some(join) = join {
            if let Err(e) = join.await {
                if e.is_panic() {
                    tracing::warn!(task = self.name, "Task panicked");
                }
            }
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("name", &self.name)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// Single-shot release hook for a host subscription.
///
/// The release closure runs at most once: on the first [`dispose`](Self::dispose)
/// call or on drop, whichever comes first.
pub struct Disposer {
    release: Mutex<Option<Release>>,
}

impl Disposer {
    /// Wrap a release closure.
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    /// Run the release closure if it has not run yet.
    ///
    /// Returns `true` if this call released the subscription.
    pub fn dispose(&self) -> bool {
        let release = self.release.lock().take();
        match release {
            Some(release) => {
                release();
                true
            }
            None => false,
        }
    }

    /// Whether the subscription has been released (or never held anything).
    pub fn is_disposed(&self) -> bool {
        self.release.lock().is_none()
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
