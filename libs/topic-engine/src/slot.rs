//! Single-value rendezvous between one writer and one reader.
//!
//! The writer deposits a value and waits until the reader has taken it.
//! The reader never waits: it takes whatever is present or gets `None`.
//! At most one value is ever held, so a slow reader stalls the writer
//! instead of growing a queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

struct Shared<T> {
    value: Mutex<Option<T>>,
    /// Signalled on take and on receiver drop. Only the writer waits on it.
    taken: Notify,
    closed: AtomicBool,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The receiving half was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotClosed;

impl std::fmt::Display for SlotClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("slot receiver dropped")
    }
}

impl std::error::Error for SlotClosed {}

pub struct SlotSender<T> {
    shared: Arc<Shared<T>>,
}

pub struct SlotReceiver<T> {
    shared: Arc<Shared<T>>,
}

pub fn slot<T>() -> (SlotSender<T>, SlotReceiver<T>) {
    let shared = Arc::new(Shared {
        value: Mutex::new(None),
        taken: Notify::new(),
        closed: AtomicBool::new(false),
    });
    (
        SlotSender { shared: shared.clone() },
        SlotReceiver { shared },
    )
}

impl<T> SlotSender<T> {
    /// Deposit `value` and wait until the receiver takes it.
    ///
    /// Dropping the returned future after it started leaves the value in
    /// the slot for the receiver.
    pub async fn send(&mut self, value: T) -> Result<(), SlotClosed> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(SlotClosed);
        }
        *self.shared.lock() = Some(value);

        loop {
            // Notify keeps a permit if the take happens before we wait,
            // so re-checking after every wakeup is enough.
            if self.shared.lock().is_none() {
                return Ok(());
            }
            if self.shared.closed.load(Ordering::Acquire) {
                return Err(SlotClosed);
            }
            self.shared.taken.notified().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl<T> SlotReceiver<T> {
    /// Take the pending value, if any. Never waits.
    pub fn try_recv(&self) -> Option<T> {
        let value = self.shared.lock().take();
        if value.is_some() {
            self.shared.taken.notify_one();
        }
        value
    }

    /// Whether a value is waiting to be taken.
    pub fn is_ready(&self) -> bool {
        self.shared.lock().is_some()
    }
}

impl<T> Drop for SlotReceiver<T> {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.taken.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn empty_slot_returns_none() {
        let (_tx, rx) = slot::<u32>();
        assert!(!rx.is_ready());
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn send_waits_until_taken() {
        let (mut tx, rx) = slot();
        let writer = tokio::spawn(async move {
            tx.send(1).await.unwrap();
            tx.send(2).await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.is_ready());
        assert!(!writer.is_finished());

        assert_eq!(rx.try_recv(), Some(1));
        assert_eq!(rx.try_recv(), None);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !rx.is_ready() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(rx.try_recv(), Some(2));

        tokio::time::timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn dropped_receiver_releases_sender() {
        let (mut tx, rx) = slot();
        let writer = tokio::spawn(async move { tx.send("x").await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(rx);
        let res = tokio::time::timeout(Duration::from_secs(1), writer).await.unwrap().unwrap();
        assert_eq!(res, Err(SlotClosed));
    }

    #[tokio::test]
    async fn send_after_close_fails_fast() {
        let (mut tx, rx) = slot::<u8>();
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.send(1).await, Err(SlotClosed));
    }
}
