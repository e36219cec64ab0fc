// Debounced flushing.
// The first schedule in a quiet period arms a timer; later ones are no-ops until it fires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::warn;

/// Default debounce window for snapshot writes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

type FlushAction = Arc<dyn Fn() + Send + Sync>;

/// Collapses bursts of `schedule` calls into one delayed `action` run.
pub struct Debouncer {
    delay: Duration,
    armed: Arc<AtomicBool>,
    action: FlushAction,
}

impl Debouncer {
    pub fn new(delay: Duration, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            delay,
            armed: Arc::new(AtomicBool::new(false)),
            action: Arc::new(action),
        }
    }

    /// Arm the timer unless it is already armed.
    ///
    /// Outside a Tokio runtime there is nothing to drive the timer, so the
    /// action runs immediately.
    pub fn schedule(&self) {
        if self.armed.swap(true, Ordering::AcqRel) {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            self.armed.store(false, Ordering::Release);
            (self.action)();
            return;
        };

        let armed = Arc::clone(&self.armed);
        let action = Arc::clone(&self.action);
        let delay = self.delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Disarm first so mutations made during the flush re-arm
            if armed.swap(false, Ordering::AcqRel) {
                // The action does blocking file IO
                if let Err(e) = tokio::task::spawn_blocking(move || action()).await {
                    warn!(error = %e, "Debounced flush failed");
                }
            }
        });
    }

    /// Run the action now and cancel any armed timer.
    pub fn flush_now(&self) {
        self.armed.store(false, Ordering::Release);
        (self.action)();
    }

    /// Whether a flush is waiting on the timer.
    pub fn is_pending(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}
