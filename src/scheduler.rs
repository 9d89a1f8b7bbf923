//! Bounded-concurrency fan-out.
//!
//! [`run_bounded`] drives N async work units with at most `cap` in flight,
//! returning results in input order regardless of completion order. Workers
//! share a cursor over the task list: each claims the next unclaimed index,
//! awaits it, stores the value in that index's slot and claims again until the
//! list is exhausted or cancellation is observed.
//!
//! All workers are polled on the caller's task, so "concurrent" here means
//! interleaved waiting, not OS-level parallelism.

use crate::cancel::Cancellation;
use crate::error::{Result, WorkflowError};
use futures::future::try_join_all;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Settled-task count reported after every completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Tasks settled so far
    pub done: usize,
    /// Tasks submitted
    pub total: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.done, self.total)
    }
}

/// Run `tasks` with at most `cap` of them in flight at any instant.
///
/// - `results[i]` is the value produced by `tasks[i]`.
/// - Once `cancel` reports a stop, no further task is started and the call
///   fails with [`WorkflowError::Cancelled`]; values from tasks still running
///   are discarded.
/// - The first failing task fails the whole call.
/// - `on_progress` fires after every successful settle.
///
/// A `cap` of zero is treated as one.
pub async fn run_bounded<T, F, Fut, P>(
    tasks: Vec<F>,
    cap: usize,
    cancel: &Cancellation,
    on_progress: P,
) -> Result<Vec<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(Progress),
{
    let total = tasks.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    cancel.check()?;

    if total == 1 {
        let mut tasks = tasks;
        let Some(task) = tasks.pop() else {
            return Ok(Vec::new());
        };
        let value = task().await?;
        cancel.check()?;
        on_progress(Progress { done: 1, total });
        return Ok(vec![value]);
    }

    let workers = cap.clamp(1, total);
    tracing::debug!(total, workers, "Starting bounded fan-out");

    let shared = Shared {
        queue: Mutex::new(tasks.into_iter().enumerate()),
        slots: Mutex::new((0..total).map(|_| None).collect()),
        done: AtomicUsize::new(0),
        total,
    };

    try_join_all((0..workers).map(|_| worker(&shared, cancel, &on_progress))).await?;

    shared
        .slots
        .into_inner()
        .into_iter()
        .collect::<Option<Vec<T>>>()
        .ok_or_else(|| WorkflowError::Other(anyhow::anyhow!("fan-out finished with unfilled result slots")))
}

struct Shared<I, T> {
    queue: Mutex<I>,
    slots: Mutex<Vec<Option<T>>>,
    done: AtomicUsize,
    total: usize,
}

async fn worker<I, F, Fut, T, P>(shared: &Shared<I, T>, cancel: &Cancellation, on_progress: &P) -> Result<()>
where
    I: Iterator<Item = (usize, F)>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(Progress),
{
    loop {
        cancel.check()?;
        let Some((index, task)) = shared.queue.lock().next() else {
            return Ok(());
        };

        let value = task().await?;
        cancel.check()?;

        shared.slots.lock()[index] = Some(value);
        let done = shared.done.fetch_add(1, Ordering::SeqCst) + 1;
        let progress = Progress {
            done,
            total: shared.total,
        };
        tracing::trace!(%progress, index, "Task settled");
        on_progress(progress);
    }
}
