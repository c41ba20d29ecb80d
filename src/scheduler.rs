//! The presentation thread: a single OS thread owning all surface and window
//! mutation, fed through a FIFO job queue.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::{mpsc, oneshot};

use crate::errors::DisplayError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Marshals work onto the presentation thread. Tasks submitted from that
/// thread itself run inline (reentrancy fast path, so a command issued from
/// within a running task cannot deadlock); all other tasks are queued and
/// drained in order.
pub struct UiScheduler {
    tx: Option<mpsc::UnboundedSender<Job>>,
    thread_id: ThreadId,
    join: Option<JoinHandle<()>>,
}

impl UiScheduler {
    /// Spawns the presentation thread. `init` runs on it before any task is
    /// accepted; an init failure aborts the spawn.
    pub fn spawn<I>(name: &str, init: I) -> Result<Self, DisplayError>
    where
        I: FnOnce() -> Result<(), DisplayError> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let join = thread::Builder::new().name(name.to_owned()).spawn(move || {
            let init_result = init();
            let failed = init_result.is_err();
            let _ = ready_tx.send(init_result);
            if failed {
                return;
            }
            while let Some(job) = rx.blocking_recv() {
                job();
            }
        })?;

        ready_rx.recv().map_err(|_| DisplayError::NotRunning)??;

        Ok(Self {
            thread_id: join.thread().id(),
            tx: Some(tx),
            join: Some(join),
        })
    }

    /// True when called from the presentation thread.
    pub fn on_presentation_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Submits `task` for execution on the presentation thread and returns a
    /// future resolving with its result. Errors and panics inside the task
    /// resolve the future; they never take down the presentation thread or
    /// other queued tasks.
    pub fn submit<T, F>(&self, task: F) -> ScheduledTask<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, DisplayError> + Send + 'static,
    {
        if self.on_presentation_thread() {
            let result =
                catch_unwind(AssertUnwindSafe(task)).unwrap_or(Err(DisplayError::TaskPanicked));
            return ScheduledTask::ready(result);
        }

        let Some(tx) = self.tx.as_ref() else {
            return ScheduledTask::ready(Err(DisplayError::NotRunning));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let result =
                catch_unwind(AssertUnwindSafe(task)).unwrap_or(Err(DisplayError::TaskPanicked));
            let _ = reply_tx.send(result);
        });

        if tx.send(job).is_err() {
            return ScheduledTask::ready(Err(DisplayError::NotRunning));
        }
        ScheduledTask::pending(reply_rx)
    }
}

impl Drop for UiScheduler {
    fn drop(&mut self) {
        // Closing the queue lets the thread drain remaining jobs and exit.
        self.tx.take();
        if let Some(join) = self.join.take() {
            if thread::current().id() != self.thread_id {
                let _ = join.join();
            }
        }
    }
}

enum TaskInner<T> {
    Ready(Option<Result<T, DisplayError>>),
    Pending(oneshot::Receiver<Result<T, DisplayError>>),
}

/// Handle to a task scheduled on the presentation thread. Awaitable as a
/// future; sync callers can use [`ScheduledTask::wait`].
pub struct ScheduledTask<T> {
    inner: TaskInner<T>,
}

impl<T> ScheduledTask<T> {
    pub(crate) fn ready(result: Result<T, DisplayError>) -> Self {
        Self {
            inner: TaskInner::Ready(Some(result)),
        }
    }

    fn pending(rx: oneshot::Receiver<Result<T, DisplayError>>) -> Self {
        Self {
            inner: TaskInner::Pending(rx),
        }
    }

    /// Blocks the calling thread until the task has run. Must not be called
    /// from within an async runtime; use `.await` there instead.
    pub fn wait(self) -> Result<T, DisplayError> {
        match self.inner {
            TaskInner::Ready(mut slot) => slot.take().expect("task already consumed"),
            TaskInner::Pending(rx) => rx
                .blocking_recv()
                .unwrap_or(Err(DisplayError::NotRunning)),
        }
    }
}

// `Ready` holds T by value and the oneshot receiver is itself Unpin, so the
// task can be polled through `get_mut` regardless of T.
impl<T> Unpin for ScheduledTask<T> {}

impl<T> Future for ScheduledTask<T> {
    type Output = Result<T, DisplayError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.inner {
            TaskInner::Ready(slot) => {
                Poll::Ready(slot.take().expect("task polled after completion"))
            }
            TaskInner::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|recv| recv.unwrap_or(Err(DisplayError::NotRunning))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn spawn_scheduler() -> Arc<UiScheduler> {
        Arc::new(UiScheduler::spawn("presentation-test", || Ok(())).unwrap())
    }

    #[test]
    fn tasks_run_on_the_presentation_thread() {
        let scheduler = spawn_scheduler();
        let inner = scheduler.clone();
        let on_thread = scheduler
            .submit(move || Ok(inner.on_presentation_thread()))
            .wait()
            .unwrap();
        assert!(on_thread);
        assert!(!scheduler.on_presentation_thread());
    }

    #[test]
    fn tasks_run_in_submission_order() {
        let scheduler = spawn_scheduler();
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::new();
        for i in 0..64 {
            let counter = counter.clone();
            tasks.push(scheduler.submit(move || {
                let seen = counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(seen, i);
                Ok(())
            }));
        }
        for task in tasks {
            task.wait().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 64);
    }

    #[test]
    fn reentrant_submit_completes_synchronously() {
        let scheduler = spawn_scheduler();
        let inner = scheduler.clone();
        let result = scheduler
            .submit(move || {
                // Submitted from within a running task: must execute inline
                // rather than deadlock waiting on the busy queue.
                inner.submit(|| Ok(21 * 2)).wait()
            })
            .wait()
            .unwrap();
        assert_eq!(result, 42);
    }

    #[test]
    fn task_error_resolves_only_that_future() {
        let scheduler = spawn_scheduler();
        let failing = scheduler.submit(|| -> Result<(), DisplayError> {
            Err(DisplayError::InvalidPayload("bad".into()))
        });
        assert!(matches!(
            failing.wait(),
            Err(DisplayError::InvalidPayload(_))
        ));

        // The presentation thread is still alive and serving tasks.
        assert_eq!(scheduler.submit(|| Ok(1)).wait().unwrap(), 1);
    }

    #[test]
    fn task_panic_is_contained() {
        let scheduler = spawn_scheduler();
        let panicking = scheduler.submit(|| -> Result<(), DisplayError> {
            panic!("task blew up");
        });
        assert!(matches!(panicking.wait(), Err(DisplayError::TaskPanicked)));
        assert_eq!(scheduler.submit(|| Ok(7)).wait().unwrap(), 7);
    }

    #[test]
    fn failing_init_aborts_spawn() {
        let result = UiScheduler::spawn("presentation-test", || {
            Err(DisplayError::InvalidPayload("no state".into()))
        });
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn scheduled_task_is_awaitable() {
        let scheduler = spawn_scheduler();
        let value = scheduler.submit(|| Ok("done")).await.unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn scheduled_task_is_awaitable_for_non_unpin_payloads() {
        let scheduler = spawn_scheduler();
        let value = scheduler.submit(|| Ok(std::marker::PhantomPinned)).await;
        assert!(value.is_ok());
    }
}
