//! Work queue feeding URLs to the dispatcher's workers.
//!
//! The queue is sized to the whole input so the producer never waits.
//! Closing it hands back the consumer side, which any number of workers can
//! share; each URL is delivered to exactly one of them.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::error::ProbeError;

/// Producer side of the work queue.
#[derive(Debug)]
pub struct WorkQueue {
    sender: mpsc::Sender<String>,
    receiver: WorkQueueReceiver,
    capacity: usize,
}

/// Shared consumer side of a closed work queue.
#[derive(Debug, Clone)]
pub struct WorkQueueReceiver {
    inner: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl WorkQueue {
    /// Create a queue able to hold `capacity` URLs without blocking.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: WorkQueueReceiver {
                inner: Arc::new(Mutex::new(receiver)),
            },
            capacity,
        }
    }

    /// Build a queue holding `urls` and close it.
    pub fn from_urls<I>(urls: I) -> Result<WorkQueueReceiver, ProbeError>
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: ExactSizeIterator,
    {
        let urls = urls.into_iter();
        let queue = Self::with_capacity(urls.len());
        for url in urls {
            queue.enqueue(url)?;
        }
        Ok(queue.close())
    }

    /// Add one URL. Fails instead of blocking when the queue is full.
    pub fn enqueue(&self, url: String) -> Result<(), ProbeError> {
        self.sender.try_send(url).map_err(|e| match e {
            mpsc::error::TrySendError::Full(url) => ProbeError::internal(format!(
                "work queue full (capacity {}) while enqueueing '{}'",
                self.capacity, url
            )),
            mpsc::error::TrySendError::Closed(url) => {
                ProbeError::internal(format!("work queue closed while enqueueing '{}'", url))
            }
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Signal that no more URLs will arrive and return the consumer side.
    pub fn close(self) -> WorkQueueReceiver {
        drop(self.sender);
        self.receiver
    }
}

impl WorkQueueReceiver {
    /// Take the next URL, or `None` once the queue is empty and closed.
    pub async fn next(&self) -> Option<String> {
        self.inner.lock().await.recv().await
    }
}
