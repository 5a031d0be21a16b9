use std::collections::VecDeque;
use std::future::Future;

use anyhow::{Context, Result, bail};
use tokio::sync::{Mutex, Semaphore, TryAcquireError};

use crate::pipeline::liveness::LivenessCounter;

/// Fixed-capacity FIFO shared between producer and consumer tasks.
///
/// `slots_free` counts empty slots and `items_available` counts items that
/// are in the buffer and not yet claimed by a popper. Both waits suspend the
/// task; nothing spins. Permits are only forgotten once the buffer mutation
/// has happened, so dropping a suspended `push` or `pop` never strands a
/// slot or an item.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    buffer: Mutex<VecDeque<T>>,
    slots_free: Semaphore,
    items_available: Semaphore,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            bail!("queue capacity must be at least 1");
        }
        if capacity > Semaphore::MAX_PERMITS {
            bail!("queue capacity {capacity} exceeds {}", Semaphore::MAX_PERMITS);
        }
        Ok(Self {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            slots_free: Semaphore::new(capacity),
            items_available: Semaphore::new(0),
        })
    }

    pub async fn is_empty(&self) -> bool {
        self.buffer.lock().await.is_empty()
    }

    /// Append `item`, waiting while the queue is full.
    pub async fn push(&self, item: T) -> Result<()> {
        let slot = self.slots_free.acquire().await.context("queue slots closed")?;
        self.buffer.lock().await.push_back(item);
        slot.forget();
        self.items_available.add_permits(1);
        Ok(())
    }

    /// Remove the oldest item, waiting while the queue is empty.
    pub async fn pop(&self) -> Result<T> {
        let claim = self.items_available.acquire().await.context("queue items closed")?;
        let item = self.take_front().await?;
        claim.forget();
        Ok(item)
    }

    /// Remove the oldest item if one is unclaimed right now.
    pub async fn try_pop(&self) -> Result<Option<T>> {
        match self.items_available.try_acquire() {
            Ok(claim) => {
                let item = self.take_front().await?;
                claim.forget();
                Ok(Some(item))
            }
            Err(TryAcquireError::NoPermits) => Ok(None),
            Err(TryAcquireError::Closed) => bail!("queue items closed"),
        }
    }

    /// Pop, or give up once `done` completes and nothing is left to claim.
    ///
    /// `done` must only complete when no further push can happen. Items that
    /// are still in the buffer at that point are handed out before `None`.
    pub async fn pop_unless<F>(&self, done: F) -> Result<Option<T>>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            item = self.pop() => item.map(Some),
            _ = done => self.try_pop().await,
        }
    }

    /// True when the buffer is empty and no producer is left to refill it.
    ///
    /// Lock order: buffer, then counter.
    pub async fn is_drained(&self, liveness: &LivenessCounter) -> bool {
        let buffer = self.buffer.lock().await;
        let remaining = liveness.read().await;
        buffer.is_empty() && remaining == 0
    }

    async fn take_front(&self) -> Result<T> {
        let item = self.buffer.lock().await.pop_front();
        let Some(item) = item else {
            bail!("queue claimed an item that was not buffered")
        };
        self.slots_free.add_permits(1);
        Ok(item)
    }
}
