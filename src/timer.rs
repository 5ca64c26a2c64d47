//! Cancelable one-shot timers.

use std::{future::Future, time::Duration};
use tokio::task::JoinHandle;

/// Handle to a scheduled task. Cancelling (or dropping) the handle aborts the
/// task whether it is still waiting or already running its body.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `body` after `delay` unless the returned handle is cancelled first.
pub fn schedule<F>(delay: Duration, body: F) -> TimerHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        body.await;
    });
    TimerHandle { task }
}
