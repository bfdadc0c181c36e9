use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::task::{BoxedWork, TaskHandle, TaskRunner};

struct QueuedJob {
    work: BoxedWork,
    spawned: oneshot::Sender<tokio::task::AbortHandle>,
}

/// Default in-process scheduler: a bounded channel feeds a single worker
/// loop that `tokio::spawn`s each unit of work as it is dequeued. Queueing
/// (not execution) is what the bound protects — once dequeued, units run
/// concurrently on the runtime like any other spawned task.
pub struct ChannelTaskRunner {
    sender: mpsc::Sender<QueuedJob>,
}

impl ChannelTaskRunner {
    pub fn new(queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        tokio::spawn(Self::run_loop(receiver));
        Self { sender }
    }

    async fn run_loop(mut receiver: mpsc::Receiver<QueuedJob>) {
        debug!(target: "jobs::runner", "task runner loop started");
        while let Some(job) = receiver.recv().await {
            let handle = tokio::spawn(job.work);
            if job.spawned.send(handle.abort_handle()).is_err() {
                warn!(target: "jobs::runner", "submitter dropped before spawn acknowledgement");
            }
        }
        debug!(target: "jobs::runner", "task runner loop stopped");
    }

}

#[async_trait]
impl TaskRunner for ChannelTaskRunner {
    /// Waits only for the work to be accepted into the runtime (not for it
    /// to finish). Suspends on the bounded channel when the queue is full.
    async fn submit(&self, work: BoxedWork) -> TaskHandle {
        let (spawned_tx, spawned_rx) = oneshot::channel();
        let job = QueuedJob {
            work,
            spawned: spawned_tx,
        };

        if self.sender.send(job).await.is_err() {
            // Worker loop is gone; run inline so the caller still gets a
            // handle rather than a lost submission.
            let noop: BoxedWork = Box::pin(async {});
            let handle = tokio::spawn(noop);
            return TaskHandle::new(handle.abort_handle());
        }

        match spawned_rx.await {
            Ok(abort) => TaskHandle::new(abort),
            Err(_) => {
                let noop: BoxedWork = Box::pin(async {});
                let handle = tokio::spawn(noop);
                TaskHandle::new(handle.abort_handle())
            }
        }
    }
}
