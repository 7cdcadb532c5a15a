//! Delayed, cancelable tasks.
//!
//! A [`ScheduledTask`] aborts its future when dropped. Storing the handle in a
//! slot and overwriting it is therefore enough to reset a debounce: the
//! previous task is cancelled before its body runs.

use futures::future::{AbortHandle, Abortable, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;

/// Executor seam. The browser build runs tasks on the zoon executor, tests on tokio.
pub trait Runtime: Send + Sync + 'static {
    /// Runs `task` once `delay` has elapsed.
    fn spawn_after(&self, delay: Duration, task: BoxFuture<'static, ()>);
}

/// zoon executor and browser timers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZoonRuntime;

impl Runtime for ZoonRuntime {
    fn spawn_after(&self, delay: Duration, task: BoxFuture<'static, ()>) {
        let delay_ms = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        zoon::Task::start(async move {
            if delay_ms > 0 {
                zoon::Timer::sleep(delay_ms).await;
            }
            task.await;
        });
    }
}

#[derive(Clone)]
pub struct Scheduler {
    runtime: Arc<dyn Runtime>,
}

impl Scheduler {
    pub fn new(runtime: impl Runtime) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }

    pub fn zoon() -> Self {
        Self::new(ZoonRuntime)
    }

    pub fn schedule_after(
        &self,
        delay: Duration,
        task: impl Future<Output = ()> + Send + 'static,
    ) -> ScheduledTask {
        let (abort_handle, registration) = AbortHandle::new_pair();
        let task = Abortable::new(task, registration).map(|_| ());
        self.runtime.spawn_after(delay, task.boxed());
        ScheduledTask { abort_handle }
    }

    pub fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) -> ScheduledTask {
        self.schedule_after(Duration::ZERO, task)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

/// Handle to a scheduled task; dropping it cancels the task.
#[derive(Debug)]
#[must_use = "dropping a ScheduledTask cancels it"]
pub struct ScheduledTask {
    abort_handle: AbortHandle,
}

impl ScheduledTask {
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_cancelled(&self) -> bool {
        self.abort_handle.is_aborted()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TokioRuntime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn task_runs_after_delay() {
        let scheduler = Scheduler::new(TokioRuntime);
        let runs = Arc::new(AtomicUsize::new(0));

        let task = scheduler.schedule_after(Duration::from_millis(300), {
            let runs = runs.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        drop(task);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_a_slot_cancels_the_previous_task() {
        let scheduler = Scheduler::new(TokioRuntime);
        let runs = Arc::new(AtomicUsize::new(0));
        let mut slot: Option<ScheduledTask> = None;

        for _ in 0..5 {
            let runs = runs.clone();
            slot = Some(scheduler.schedule_after(Duration::from_millis(300), async move {
                runs.fetch_add(1, Ordering::SeqCst);
            }));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(slot.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs() {
        let scheduler = Scheduler::new(TokioRuntime);
        let runs = Arc::new(AtomicUsize::new(0));

        let task = scheduler.schedule_after(Duration::from_millis(100), {
            let runs = runs.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });
        task.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
