//! Press-and-hold confirmation for destructive buttons.
//!
//! [`HoldGesture`] is the timing logic alone. [`HoldConfirm`] drives it with a
//! frame loop on the [`Scheduler`], publishes progress and fires the action
//! exactly once per completed hold.

use crate::scheduler::{ScheduledTask, Scheduler};
use crate::telemetry::Telemetry;
use shared::HoldConfirmSection;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use zoon::{Mutable, Signal, SignalExt};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldTick {
    /// 0.0 ..= 1.0
    pub progress: f64,
    /// True on the one tick that completed the hold
    pub fired: bool,
}

#[derive(Debug, Clone)]
pub struct HoldGesture {
    duration: Duration,
    elapsed: Duration,
    holding: bool,
    fired: bool,
}

impl HoldGesture {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            elapsed: Duration::ZERO,
            holding: false,
            fired: false,
        }
    }

    pub fn press(&mut self) {
        self.elapsed = Duration::ZERO;
        self.holding = true;
        self.fired = false;
    }

    pub fn tick(&mut self, delta: Duration) -> HoldTick {
        if !self.holding || self.fired {
            return HoldTick {
                progress: self.progress(),
                fired: false,
            };
        }
        self.elapsed += delta;
        if self.elapsed >= self.duration {
            self.fired = true;
            self.holding = false;
            return HoldTick {
                progress: 1.0,
                fired: true,
            };
        }
        HoldTick {
            progress: self.progress(),
            fired: false,
        }
    }

    /// Ends the hold and resets progress. Returns `true` if the hold was
    /// abandoned before it completed.
    pub fn release(&mut self) -> bool {
        let abandoned = self.holding && !self.fired;
        self.elapsed = Duration::ZERO;
        self.holding = false;
        self.fired = false;
        abandoned
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    pub fn progress(&self) -> f64 {
        if self.fired || self.duration.is_zero() {
            return if self.fired { 1.0 } else { 0.0 };
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }
}

struct HoldInner {
    gesture: Mutex<HoldGesture>,
    progress: Mutable<f64>,
    frame: Duration,
    scheduler: Scheduler,
    frame_task: Mutex<Option<ScheduledTask>>,
    on_confirm: Box<dyn Fn() + Send + Sync>,
    action: String,
    telemetry: Arc<dyn Telemetry>,
}

/// Hold-to-confirm button state.
#[derive(Clone)]
pub struct HoldConfirm {
    inner: Arc<HoldInner>,
}

impl HoldConfirm {
    pub fn new(
        action: impl Into<String>,
        settings: &HoldConfirmSection,
        scheduler: Scheduler,
        telemetry: Arc<dyn Telemetry>,
        on_confirm: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(HoldInner {
                gesture: Mutex::new(HoldGesture::new(Duration::from_millis(settings.duration_ms))),
                progress: Mutable::new(0.0),
                frame: Duration::from_millis(settings.frame_ms),
                scheduler,
                frame_task: Mutex::new(None),
                on_confirm: Box::new(on_confirm),
                action: action.into(),
                telemetry,
            }),
        }
    }

    pub fn press(&self) {
        lock(&self.inner.gesture).press();
        self.inner.progress.set_neq(0.0);
        self.schedule_frame();
    }

    pub fn release(&self) {
        lock(&self.inner.frame_task).take();
        let abandoned = lock(&self.inner.gesture).release();
        self.inner.progress.set_neq(0.0);
        if abandoned {
            self.inner
                .telemetry
                .log_event("hold_aborted", &[("action", self.inner.action.clone())]);
        }
    }

    pub fn progress(&self) -> f64 {
        self.inner.progress.get()
    }

    pub fn progress_signal(&self) -> impl Signal<Item = f64> + use<> {
        self.inner.progress.signal().dedupe()
    }

    fn schedule_frame(&self) {
        let weak: Weak<HoldInner> = Arc::downgrade(&self.inner);
        let task = self.inner.scheduler.schedule_after(self.inner.frame, async move {
            if let Some(inner) = weak.upgrade() {
                HoldConfirm { inner }.on_frame();
            }
        });
        *lock(&self.inner.frame_task) = Some(task);
    }

    fn on_frame(&self) {
        let (tick, holding) = {
            let mut gesture = lock(&self.inner.gesture);
            let tick = gesture.tick(self.inner.frame);
            (tick, gesture.is_holding())
        };
        self.inner.progress.set_neq(tick.progress);

        if tick.fired {
            log::debug!("hold_confirm: {} confirmed", self.inner.action);
            self.inner
                .telemetry
                .log_event("hold_confirmed", &[("action", self.inner.action.clone())]);
            (self.inner.on_confirm)();
        } else if holding {
            self.schedule_frame();
        }
    }
}

impl std::fmt::Debug for HoldConfirm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoldConfirm")
            .field("action", &self.inner.action)
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingTelemetry, TokioRuntime};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn gesture_fires_once_at_full_duration() {
        let mut gesture = HoldGesture::new(Duration::from_millis(100));
        gesture.press();

        let half = gesture.tick(Duration::from_millis(50));
        assert_eq!(half, HoldTick { progress: 0.5, fired: false });

        let done = gesture.tick(Duration::from_millis(50));
        assert!(done.fired);
        assert_eq!(done.progress, 1.0);

        let after = gesture.tick(Duration::from_millis(50));
        assert!(!after.fired);
        assert!(!gesture.release());
        assert_eq!(gesture.progress(), 0.0);
    }

    #[test]
    fn early_release_resets_without_firing() {
        let mut gesture = HoldGesture::new(Duration::from_millis(100));
        gesture.press();
        gesture.tick(Duration::from_millis(90));

        assert!(gesture.release());
        assert_eq!(gesture.progress(), 0.0);
        assert!(!gesture.tick(Duration::from_millis(50)).fired);
    }

    fn hold_button(confirmed: &Arc<AtomicUsize>, telemetry: &Arc<RecordingTelemetry>) -> HoldConfirm {
        let confirmed = confirmed.clone();
        HoldConfirm::new(
            "discard_changes",
            &HoldConfirmSection::default(),
            Scheduler::new(TokioRuntime),
            telemetry.clone(),
            move || {
                confirmed.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn releasing_early_never_confirms() {
        let confirmed = Arc::new(AtomicUsize::new(0));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let button = hold_button(&confirmed, &telemetry);

        button.press();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(button.progress() > 0.5);
        button.release();
        tokio::time::sleep(Duration::from_millis(2000)).await;

        assert_eq!(confirmed.load(Ordering::SeqCst), 0);
        assert_eq!(button.progress(), 0.0);
        assert_eq!(telemetry.count("hold_aborted"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn holding_long_enough_confirms_exactly_once() {
        let confirmed = Arc::new(AtomicUsize::new(0));
        let telemetry = Arc::new(RecordingTelemetry::default());
        let button = hold_button(&confirmed, &telemetry);

        button.press();
        tokio::time::sleep(Duration::from_millis(1700)).await;
        assert_eq!(confirmed.load(Ordering::SeqCst), 1);
        assert_eq!(button.progress(), 1.0);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        button.release();
        assert_eq!(confirmed.load(Ordering::SeqCst), 1);
        assert_eq!(telemetry.count("hold_confirmed"), 1);
        assert_eq!(telemetry.count("hold_aborted"), 0);
    }
}
