//! Deadline scheduling for holds. One cancellable deferred task per key
//! instead of a polling loop, so deadlines fire on time and a confirm or
//! cancel that beats the timer is a plain task abort.

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

pub struct ExpiryTimers {
    handles: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl ExpiryTimers {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Run `action` at `deadline` unless cancelled first. Rescheduling the
    /// same key aborts the previous task.
    pub async fn schedule<F>(&self, key: Uuid, deadline: Instant, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            action.await;
        });
        let mut handles = self.handles.lock().await;
        if let Some(old) = handles.insert(key, handle) {
            old.abort();
        }
    }

    /// Abort the scheduled task for `key`. Returns whether a task was
    /// tracked. Aborting an already-fired task is harmless; the status
    /// compare-and-swap in the caller is what decides the race.
    pub async fn cancel(&self, key: Uuid) -> bool {
        let mut handles = self.handles.lock().await;
        match handles.remove(&key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop tracking for `key` without aborting. Used by the deadline action
    /// itself once it has fired; aborting from inside the task would cancel
    /// the action mid-flight.
    pub async fn discard(&self, key: Uuid) {
        self.handles.lock().await.remove(&key);
    }

    pub async fn tracked(&self) -> usize {
        self.handles.lock().await.len()
    }
}

impl Default for ExpiryTimers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fires_at_deadline() {
        let timers = ExpiryTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&fired);
        timers
            .schedule(Uuid::new_v4(), Instant::now() + Duration::from_millis(20), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_beats_deadline() {
        let timers = ExpiryTimers::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let key = Uuid::new_v4();

        let counter = Arc::clone(&fired);
        timers
            .schedule(key, Instant::now() + Duration::from_millis(80), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(timers.cancel(key).await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timers.cancel(key).await);
    }
}
