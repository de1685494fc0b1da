//! One-shot timers for the connection manager.

use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;

/// Delivers a single message to a channel after a delay, unless cancelled
/// first. Scheduling again replaces the pending message. Dropping the timer
/// cancels it.
#[derive(Debug, Default)]
pub(crate) struct Timer {
    task: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn schedule<T: Send + 'static>(
        &mut self,
        delay: Duration,
        target: &WeakUnboundedSender<T>,
        message: T,
    ) {
        self.cancel();
        let target = target.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = target.upgrade() {
                let _ = tx.send(message);
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Forget a timer that has already fired.
    pub fn clear(&mut self) {
        self.task = None;
    }

    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.cancel();
    }
}
