//! Batch task execution on a fixed worker pool.
//!
//! The [`TaskManager`] owns one `rayon` thread pool created up front and runs
//! batches of closures on it. A batch is a barrier: [`TaskManager::execute`]
//! returns only after every task in it has finished, so work never crosses
//! from one batch into the next. Workers claim tasks through a shared atomic
//! cursor.
//!
//! Failures never cut a batch short. Each task that returns an error or
//! panics is recorded, the rest of the batch still runs, and all failures are
//! reported together as [`PhysicsError::TaskFailures`] ordered by task index.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::{PhysicsError, Result};

/// One unit of work in a batch.
pub type Task<'a> = Box<dyn FnOnce() -> Result<()> + Send + 'a>;

/// Runs batches of tasks on a fixed-size worker pool.
pub struct TaskManager {
    pool: rayon::ThreadPool,
    thread_count: usize,
    threading_enabled: bool,
    running: AtomicBool,
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("thread_count", &self.thread_count)
            .field("threading_enabled", &self.threading_enabled)
            .finish_non_exhaustive()
    }
}

impl TaskManager {
    /// Start a pool with `thread_count` workers.
    pub fn new(thread_count: usize) -> Result<Self> {
        if thread_count == 0 {
            return Err(PhysicsError::invalid_config("thread_count must be > 0"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("rigid-worker-{i}"))
            .build()
            .map_err(|e| PhysicsError::invalid_config(format!("cannot start worker pool: {e}")))?;
        Ok(Self {
            pool,
            thread_count,
            threading_enabled: true,
            running: AtomicBool::new(false),
        })
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Whether batches are spread over the worker pool.
    #[must_use]
    pub fn is_threading_enabled(&self) -> bool {
        self.threading_enabled
    }

    /// Run batches on the calling thread instead of the pool when `false`.
    pub fn set_threading_enabled(&mut self, enabled: bool) {
        self.threading_enabled = enabled;
    }

    /// Run every task and wait for all of them.
    ///
    /// Calling `execute` from inside a running task returns
    /// [`PhysicsError::InvalidOperation`].
    pub fn execute<'a>(&self, tasks: Vec<Task<'a>>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(PhysicsError::invalid_operation(
                "task batch started while another batch is running",
            ));
        }

        trace!(tasks = tasks.len(), "executing task batch");
        let mut failures = if self.threading_enabled && self.thread_count > 1 && tasks.len() > 1 {
            self.run_parallel(tasks)
        } else {
            tasks
                .into_iter()
                .enumerate()
                .filter_map(|(index, task)| run_task(index, task).err())
                .collect()
        };
        self.running.store(false, Ordering::Release);

        if failures.is_empty() {
            return Ok(());
        }
        failures.sort_by_key(|(index, _)| *index);
        Err(PhysicsError::TaskFailures(
            failures.into_iter().map(|(_, e)| e).collect(),
        ))
    }

    fn run_parallel<'a>(&self, tasks: Vec<Task<'a>>) -> Vec<(usize, PhysicsError)> {
        let slots: Vec<Mutex<Option<Task<'a>>>> =
            tasks.into_iter().map(|t| Mutex::new(Some(t))).collect();
        let cursor = AtomicUsize::new(0);
        let failures = Mutex::new(Vec::new());
        let workers = self.thread_count.min(slots.len());

        self.pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(slot) = slots.get(index) else {
                        break;
                    };
                    let task = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                    if let Some(task) = task {
                        if let Err(failure) = run_task(index, task) {
                            failures
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push(failure);
                        }
                    }
                });
            }
        });

        failures.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_task(index: usize, task: Task<'_>) -> std::result::Result<(), (usize, PhysicsError)> {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err((
            index,
            PhysicsError::TaskFailed {
                index,
                message: e.to_string(),
            },
        )),
        Err(payload) => Err((
            index,
            PhysicsError::TaskFailed {
                index,
                message: panic_message(payload.as_ref()),
            },
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn counting_tasks(counter: &AtomicUsize, n: usize) -> Vec<Task<'_>> {
        (0..n)
            .map(|_| {
                Box::new(move || -> Result<()> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }) as Task<'_>
            })
            .collect()
    }

    #[test]
    fn test_runs_every_task() {
        let manager = TaskManager::new(4).unwrap();
        let counter = AtomicUsize::new(0);
        manager.execute(counting_tasks(&counter, 100)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_serial_when_disabled() {
        let mut manager = TaskManager::new(2).unwrap();
        manager.set_threading_enabled(false);
        let counter = AtomicUsize::new(0);
        manager.execute(counting_tasks(&counter, 10)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_tasks_write_disjoint_slices() {
        let manager = TaskManager::new(3).unwrap();
        let mut data = vec![0_usize; 12];
        let tasks: Vec<Task<'_>> = data
            .chunks_mut(4)
            .enumerate()
            .map(|(i, chunk)| {
                Box::new(move || -> Result<()> {
                    chunk.fill(i + 1);
                    Ok(())
                }) as Task<'_>
            })
            .collect();
        manager.execute(tasks).unwrap();
        assert_eq!(data, [1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn test_failures_are_aggregated() {
        let manager = TaskManager::new(4).unwrap();
        let counter = AtomicUsize::new(0);
        let mut tasks = counting_tasks(&counter, 6);
        tasks.insert(
            1,
            Box::new(|| -> Result<()> { Err(PhysicsError::invalid_operation("first")) }) as Task<'_>,
        );
        tasks.insert(4, Box::new(|| -> Result<()> { panic!("second") }) as Task<'_>);

        let err = manager.execute(tasks).unwrap_err();
        assert!(err.is_task_failure());
        let errors = err.task_errors();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], PhysicsError::TaskFailed { index: 1, .. }));
        assert!(
            matches!(&errors[1], PhysicsError::TaskFailed { index: 4, message } if message == "second")
        );
        // The healthy tasks still ran.
        assert_eq!(counter.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_nested_execute_is_rejected() {
        let manager = TaskManager::new(2).unwrap();
        let nested = Mutex::new(None);
        let tasks: Vec<Task<'_>> = vec![Box::new(|| -> Result<()> {
            let result = manager.execute(vec![Box::new(|| -> Result<()> { Ok(()) }) as Task<'_>]);
            *nested.lock().unwrap() = Some(result);
            Ok(())
        })];
        manager.execute(tasks).unwrap();
        let result = nested.into_inner().unwrap().unwrap();
        assert!(result.unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(TaskManager::new(0).unwrap_err().is_config_error());
    }
}
