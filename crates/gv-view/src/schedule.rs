//! Cancellable scheduled tasks

use std::time::Duration;

use tokio::task::JoinHandle;

/// A closure that runs once after a delay unless cancelled first.
///
/// Dropping the task cancels it. Cancelling after it has fired is a no-op.
/// Must be created inside a Tokio runtime.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Run `action` after `delay`
    pub fn after<F>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        Self { handle }
    }

    /// Cancel the task if it has not fired yet
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
