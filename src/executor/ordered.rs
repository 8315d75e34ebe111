//! Strictly sequential task queues sharing one runtime.

use std::{
    any::Any,
    collections::VecDeque,
    fmt,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::{FutureExt, future::BoxFuture};
use log::error;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

/// Creates [`OrderedExecutor`]s backed by one runtime and task tracker.
///
/// Every drain task spawned by the executors it creates is tracked, so
/// [`close`](Self::close) followed by [`wait`](Self::wait) waits for all
/// in-flight work.
#[derive(Clone, Debug)]
pub struct OrderedExecutorFactory {
    handle: Handle,
    tracker: TaskTracker,
}

impl OrderedExecutorFactory {
    /// Create a factory spawning onto `handle`.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
        }
    }

    /// Create a new, empty executor.
    ///
    /// Executors cost nothing until a task is submitted, so callers may create
    /// one speculatively and drop it.
    #[must_use]
    pub fn ordered_executor(&self) -> OrderedExecutor {
        OrderedExecutor {
            inner: Arc::new(Inner {
                queue: Mutex::new(TaskQueue::default()),
                handle: self.handle.clone(),
                tracker: self.tracker.clone(),
            }),
        }
    }

    /// Mark the tracker closed so [`wait`](Self::wait) can complete.
    pub fn close(&self) { self.tracker.close(); }

    /// Wait until every drain task has finished. Only resolves once
    /// [`close`](Self::close) has been called.
    pub async fn wait(&self) { self.tracker.wait().await; }
}

#[derive(Default)]
struct TaskQueue {
    tasks: VecDeque<BoxFuture<'static, ()>>,
    running: bool,
}

struct Inner {
    queue: Mutex<TaskQueue>,
    handle: Handle,
    tracker: TaskTracker,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, TaskQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_task(&self) -> Option<BoxFuture<'static, ()>> {
        let mut queue = self.lock();
        let task = queue.tasks.pop_front();
        if task.is_none() {
            queue.running = false;
        }
        task
    }

    async fn drain(self: Arc<Self>) {
        while let Some(task) = self.next_task() {
            if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                crate::metrics::inc_dispatch_failures();
                let panic_msg = panic_message(panic.as_ref());
                // Emit via both `log` and `tracing` for tests that capture either.
                error!("ordered task panicked: panic={panic_msg}");
                tracing::error!(panic = %panic_msg, "ordered task panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

/// Queue running its tasks one at a time in submission order.
///
/// Cloning yields another handle to the same queue. A drain task is spawned
/// only while the queue has work, and at most one exists per queue, so no two
/// tasks of one executor ever run at the same time. A task that panics is
/// logged and skipped; the tasks behind it still run.
#[derive(Clone)]
pub struct OrderedExecutor {
    inner: Arc<Inner>,
}

impl OrderedExecutor {
    /// Append `task` to the queue, starting a drain if none is running.
    pub fn execute<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut queue = self.inner.lock();
        queue.tasks.push_back(task.boxed());
        if queue.running {
            return;
        }
        queue.running = true;
        drop(queue);

        let inner = Arc::clone(&self.inner);
        self.inner
            .tracker
            .spawn_on(inner.drain(), &self.inner.handle);
    }

    /// Number of tasks waiting behind the one currently running.
    #[must_use]
    pub fn pending(&self) -> usize { self.inner.lock().tasks.len() }

    /// Whether a drain task is active for this queue.
    #[must_use]
    pub fn is_running(&self) -> bool { self.inner.lock().running }

    /// Whether `self` and `other` are handles to the same queue.
    #[must_use]
    pub fn same_queue(&self, other: &Self) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }
}

impl fmt::Debug for OrderedExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.inner.lock();
        f.debug_struct("OrderedExecutor")
            .field("pending", &queue.tasks.len())
            .field("running", &queue.running)
            .finish()
    }
}
