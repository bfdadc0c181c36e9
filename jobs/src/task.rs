use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

/// Unit of deferrable work submitted to a [`TaskRunner`]. Boxed so callers
/// (entity extraction, in particular) can submit arbitrary async closures
/// without the runner knowing their concrete type.
pub type BoxedWork = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Capability interface for running background work off the request path
/// (component I). `submit` returns as soon as the work is accepted by the
/// runtime (it may briefly suspend on a bounded queue, but never waits for
/// the work itself to finish). The returned handle lets the caller cancel
/// work that hasn't started or is still in flight.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn submit(&self, work: BoxedWork) -> TaskHandle;
}

/// Cancellation handle for one submitted unit of work. Cancelling after
/// completion is a no-op.
pub struct TaskHandle {
    abort: tokio::task::AbortHandle,
}

impl TaskHandle {
    pub(crate) fn new(abort: tokio::task::AbortHandle) -> Self {
        Self { abort }
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}
