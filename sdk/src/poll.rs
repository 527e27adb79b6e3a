//! Fixed-interval background refresh with teardown on drop.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::error::Result;

/// Re-runs a fetch every `interval` and publishes the latest success.
///
/// The first fetch runs immediately.  A failed fetch is logged and the
/// previous value stays published.  Dropping the poller aborts the task.
#[derive(Debug)]
pub struct Poller<T> {
    rx:     watch::Receiver<Option<T>>,
    handle: JoinHandle<()>,
}

impl<T> Poller<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(interval: Duration, mut fetch: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let period = interval.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match fetch().await {
                    Ok(value) => {
                        if tx.send(Some(value)).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "poll failed; keeping previous value"),
                }
            }
        });
        Self { rx, handle }
    }

    /// Most recent successful value, if any.
    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// A receiver that wakes on every published value.
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.rx.clone()
    }

    /// Abort the background task; same as dropping the poller.
    pub fn stop(self) {}
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn counting_fetch(
        counter: Arc<AtomicU64>,
        fail_on: u64,
    ) -> impl FnMut() -> std::future::Ready<Result<u64>> + Send + 'static {
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n == fail_on { Err(Error::ReserveEmpty) } else { Ok(n) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_on_interval_and_skips_failures() {
        let counter = Arc::new(AtomicU64::new(0));
        let poller = Poller::spawn(Duration::from_secs(30), counting_fetch(counter.clone(), 2));
        let mut rx = poller.subscribe();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(1));

        // Second fetch fails silently; the third publishes.
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(3));
        assert_eq!(poller.latest(), Some(3));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_polling() {
        let counter = Arc::new(AtomicU64::new(0));
        let poller = Poller::spawn(Duration::from_secs(30), counting_fetch(counter.clone(), 0));
        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();

        poller.stop();
        let seen = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }
}
