use anyhow::{Result, bail};
use tokio::sync::{Mutex, watch};

/// Count of producers that have not finished reading their source.
///
/// The count only goes down. The transition to zero is published once on
/// a watch channel so consumers parked on an empty queue wake up and
/// re-check whether any work is left.
#[derive(Debug)]
pub struct LivenessCounter {
    remaining: Mutex<usize>,
    finished: watch::Sender<bool>,
}

impl LivenessCounter {
    pub fn new(producers: usize) -> Self {
        let (finished, _) = watch::channel(producers == 0);
        Self {
            remaining: Mutex::new(producers),
            finished,
        }
    }

    /// Retire one producer. Returns the number still running.
    pub async fn decrement(&self) -> Result<usize> {
        let mut remaining = self.remaining.lock().await;
        if *remaining == 0 {
            bail!("liveness counter decremented past zero");
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.finished.send_replace(true);
        }
        Ok(*remaining)
    }

    pub async fn read(&self) -> usize {
        *self.remaining.lock().await
    }

    pub async fn is_zero(&self) -> bool {
        self.read().await == 0
    }

    /// Completes once every producer has retired.
    pub async fn wait_zero(&self) {
        let mut finished = self.finished.subscribe();
        // The sender lives as long as `self`, so this cannot see a closed channel.
        let _ = finished.wait_for(|done| *done).await;
    }
}
