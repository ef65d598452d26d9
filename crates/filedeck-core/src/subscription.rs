//! Subscription bookkeeping shared by the backends.
//!
//! Every change stream is fed by one producer task. The registry tracks those
//! tasks per topic so that unsubscribing from a topic ends all of its streams,
//! and dropping a stream stops its producer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::Result;
use crate::record::RawChange;
use crate::types::Topic;

/// Sending half handed to a producer task.
pub type ChangeSender = mpsc::UnboundedSender<Result<RawChange>>;

/// Active subscriptions, keyed by topic.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    active: Mutex<HashMap<Topic, Vec<(u64, AbortHandle)>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Spawns `producer` and returns the stream it feeds.
    ///
    /// Must be called within a Tokio runtime.
    pub fn open<F, Fut>(self: &Arc<Self>, topic: Topic, producer: F) -> ChangeSubscription
    where
        F: FnOnce(ChangeSender) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(producer(tx));
        let task = handle.abort_handle();

        self.lock()
            .entry(topic.clone())
            .or_default()
            .push((id, handle.abort_handle()));

        info!(%topic, id, "Subscription opened");

        ChangeSubscription {
            topic,
            id,
            receiver: rx,
            task,
            registry: Arc::clone(self),
        }
    }

    /// Stops every producer for `topic`. Returns how many were stopped.
    pub fn release(&self, topic: &Topic) -> usize {
        let released = self.lock().remove(topic).unwrap_or_default();
        for (_, task) in &released {
            task.abort();
        }
        if !released.is_empty() {
            info!(%topic, count = released.len(), "Subscriptions released");
        }
        released.len()
    }

    /// Stops every producer.
    pub fn release_all(&self) {
        let all: Vec<_> = self.lock().drain().collect();
        for (_, tasks) in all {
            for (_, task) in tasks {
                task.abort();
            }
        }
    }

    /// Number of open streams for `topic`.
    pub fn active(&self, topic: &Topic) -> usize {
        self.lock().get(topic).map_or(0, Vec::len)
    }

    /// Topics with at least one open stream.
    pub fn topics(&self) -> Vec<Topic> {
        self.lock().keys().cloned().collect()
    }

    fn remove(&self, topic: &Topic, id: u64) {
        let mut active = self.lock();
        if let Some(tasks) = active.get_mut(topic) {
            tasks.retain(|(task_id, _)| *task_id != id);
            if tasks.is_empty() {
                active.remove(topic);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Topic, Vec<(u64, AbortHandle)>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A change stream registered with a [`SubscriptionRegistry`].
///
/// Ends when its producer finishes or the topic is released. Dropping it
/// stops the producer.
#[derive(Debug)]
pub struct ChangeSubscription {
    topic: Topic,
    id: u64,
    receiver: mpsc::UnboundedReceiver<Result<RawChange>>,
    task: AbortHandle,
    registry: Arc<SubscriptionRegistry>,
}

impl ChangeSubscription {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl Stream for ChangeSubscription {
    type Item = Result<RawChange>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.task.abort();
        self.registry.remove(&self.topic, self.id);
        debug!(topic = %self.topic, id = self.id, "Subscription dropped");
    }
}
