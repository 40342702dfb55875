
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// TaskOutcome is what a settled operation reports to later drains. Errors are
/// reduced to their message since they are only logged there.
type TaskOutcome = std::result::Result<(), String>;

/// PendingTask is an operation still in the queue. Its position is its identity.
struct PendingTask {
    description: &'static str,
    done_rx: oneshot::Receiver<TaskOutcome>,
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PendingTask")
            .field(&self.description)
            .finish()
    }
}

/// Operation is the caller's handle on a submitted call. The call is already
/// running; awaiting [`Operation::wait`] yields its result. Dropping the
/// handle does not cancel the call.
pub struct Operation<T> {
    handle: JoinHandle<Result<T>>,
    description: &'static str,
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operation")
            .field(&"_")
            .field(&self.description)
            .finish()
    }
}

impl<T> Operation<T> {
    pub async fn wait(self) -> Result<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(err) => Err(Error::ErrTaskAborted(format!(
                "{}: {}",
                self.description, err
            ))),
        }
    }
}

/// Operations is the ordered list of calls a connection has in flight
/// against the external implementation.
///
/// Calls start as soon as they are enqueued. A drain takes the tasks pending
/// at that instant and waits for each of them in submission order; failures
/// are logged and never stop the drain.
#[derive(Default)]
pub(crate) struct Operations {
    name: String,
    pending: Mutex<Vec<PendingTask>>,
}

impl fmt::Debug for Operations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operations")
            .field("name", &self.name)
            .field("pending", &self.len())
            .finish()
    }
}

impl Operations {
    pub(crate) fn new(name: String) -> Self {
        Operations {
            name,
            pending: Mutex::new(vec![]),
        }
    }

    // Nothing panics while the lock is held, a poisoned list is still consistent.
    fn pending(&self) -> MutexGuard<'_, Vec<PendingTask>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// len returns the number of tasks a drain would wait for right now.
    pub(crate) fn len(&self) -> usize {
        self.pending().len()
    }

    /// enqueue starts `f` and appends it to the pending list, so the next
    /// drain waits for it.
    pub(crate) fn enqueue<T, F>(&self, description: &'static str, f: F) -> Operation<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let mut pending = self.pending();
        let handle = tokio::spawn(Operations::run(f, done_tx));
        pending.push(PendingTask {
            description,
            done_rx,
        });

        Operation {
            handle,
            description,
        }
    }

    /// enqueue_after_drain takes every pending task and appends its own slot
    /// in one step, then starts `f` once the taken tasks have settled.
    ///
    /// Everything enqueued before this call settles before `f` runs, and
    /// everything enqueued after it waits for `f`.
    pub(crate) fn enqueue_after_drain<T, F, Fut>(
        &self,
        description: &'static str,
        f: F,
    ) -> Operation<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let previous = {
            let mut pending = self.pending();
            let previous = std::mem::take(&mut *pending);
            pending.push(PendingTask {
                description,
                done_rx,
            });
            previous
        };

        let name = self.name.clone();
        let handle = tokio::spawn(Operations::run(
            async move {
                Operations::settle(&name, previous).await;
                f().await
            },
            done_tx,
        ));

        Operation {
            handle,
            description,
        }
    }

    /// drain waits, in submission order, for every task pending when it is
    /// called. Tasks enqueued meanwhile are left for the next drain.
    pub(crate) async fn drain(&self) {
        let tasks = std::mem::take(&mut *self.pending());
        Operations::settle(&self.name, tasks).await;
    }

    async fn settle(name: &str, tasks: Vec<PendingTask>) {
        if !tasks.is_empty() {
            log::trace!("{} waitPendingTasks {}", name, tasks.len());
        }
        for task in tasks {
            match task.done_rx.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => log::warn!("{} Task error: {}: {}", name, task.description, err),
                Err(_) => log::warn!("{} Task error: {}: aborted", name, task.description),
            }
        }
    }

    async fn run<T, F>(f: F, done_tx: oneshot::Sender<TaskOutcome>) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = f.await;
        let outcome = match &result {
            Ok(_) => Ok(()),
            Err(err) => Err(err.to_string()),
        };
        let _ = done_tx.send(outcome);
        result
    }
}
