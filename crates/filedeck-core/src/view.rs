//! Live, realtime-reconciled views of one collection.
//!
//! A [`LiveView`] owns a single task that subscribes to `collection/*`,
//! loads a snapshot and then applies every change in arrival order. Readers
//! only ever see whole [`ViewSnapshot`]s published by that task.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::notice::Notice;
use crate::query::ListQuery;
use crate::reconcile::{Keyed, RecordList, bounded_recent};
use crate::record::{ChangeAction, ChangeEvent, FromRecord, RawChange, Record};
use crate::traits::Session;
use crate::types::{CollectionName, Topic};

type Retain = Arc<dyn Fn(&Record) -> bool + Send + Sync>;

/// How a [`LiveView`] loads and presents its collection.
#[derive(Clone, Default)]
pub struct ViewOptions {
    /// Sort and filter for the snapshot.
    pub query: ListQuery,
    /// Size of the `recent` list; no recent list when `None`.
    pub recent_limit: Option<usize>,
    retain: Option<Retain>,
}

impl ViewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: ListQuery) -> Self {
        self.query = query;
        self
    }

    pub fn recent(mut self, limit: usize) -> Self {
        self.recent_limit = Some(limit);
        self
    }

    /// Keeps only records matching `predicate`.
    ///
    /// A create or update whose record no longer matches removes it from
    /// the view, so the view follows a filter that realtime events ignore.
    pub fn retain(mut self, predicate: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        self.retain = Some(Arc::new(predicate));
        self
    }

    fn keeps(&self, record: &Record) -> bool {
        self.retain.as_ref().is_none_or(|f| f(record))
    }
}

impl fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewOptions")
            .field("query", &self.query)
            .field("recent_limit", &self.recent_limit)
            .field("retain", &self.retain.is_some())
            .finish()
    }
}

/// Whether a view's content can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// The snapshot has not arrived yet.
    Loading,
    /// Snapshot loaded and realtime changes flowing.
    Ready,
    /// The snapshot or the subscription failed, or the stream ended.
    Stale,
}

impl ViewStatus {
    /// Status of a screen built from two views: loading until both have
    /// loaded, stale if either is.
    pub fn combine(self, other: ViewStatus) -> ViewStatus {
        use ViewStatus::*;
        match (self, other) {
            (Loading, _) | (_, Loading) => Loading,
            (Stale, _) | (_, Stale) => Stale,
            (Ready, Ready) => Ready,
        }
    }
}

/// An immutable published state of a view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot<T> {
    pub items: Vec<T>,
    /// Most recently updated items, newest first.
    pub recent: Vec<T>,
    pub status: ViewStatus,
    /// Incremented on every publish.
    pub revision: u64,
}

impl<T> ViewSnapshot<T> {
    fn loading() -> Self {
        Self {
            items: Vec::new(),
            recent: Vec::new(),
            status: ViewStatus::Loading,
            revision: 0,
        }
    }
}

/// A cancellable realtime view of one collection.
///
/// # Example
///
/// ```no_run
/// # async fn example<S: filedeck_core::Session + 'static>(session: std::sync::Arc<S>) {
/// use filedeck_core::{CollectionName, FileRecord, LiveView, ViewOptions, ViewStatus};
///
/// let mut view: LiveView<FileRecord> =
///     LiveView::activate(session, CollectionName::files(), ViewOptions::new().recent(4));
///
/// while let Some(snapshot) = view.changed().await {
///     if snapshot.status == ViewStatus::Ready {
///         println!("{} files", snapshot.items.len());
///     }
/// }
/// view.deactivate().await;
/// # }
/// ```
pub struct LiveView<T> {
    topic: Topic,
    snapshots: watch::Receiver<Arc<ViewSnapshot<T>>>,
    notices: mpsc::UnboundedReceiver<Notice>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<T> LiveView<T>
where
    T: FromRecord + Keyed + Clone + Send + Sync + 'static,
{
    /// Starts the view task for `collection`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn activate<S>(session: Arc<S>, collection: CollectionName, options: ViewOptions) -> Self
    where
        S: Session + 'static,
    {
        let topic = Topic::all(collection.clone());
        let (snapshot_tx, snapshots) = watch::channel(Arc::new(ViewSnapshot::loading()));
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = Worker {
            collection,
            topic: topic.clone(),
            options,
            list: RecordList::new(),
            status: ViewStatus::Loading,
            revision: 0,
            snapshots: snapshot_tx,
            notices: notice_tx,
            _marker: PhantomData,
        };

        info!(%topic, "Activating view");
        let task = tokio::spawn(worker.run(session, shutdown_rx));

        Self {
            topic,
            snapshots,
            notices,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

impl<T> LiveView<T> {
    /// The topic this view follows.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<ViewSnapshot<T>> {
        Arc::clone(&self.snapshots.borrow())
    }

    /// Waits for the next published snapshot. `None` once the view task has ended.
    pub async fn changed(&mut self) -> Option<Arc<ViewSnapshot<T>>> {
        self.snapshots.changed().await.ok()?;
        Some(Arc::clone(&self.snapshots.borrow_and_update()))
    }

    /// Waits until a snapshot satisfies `done`, returning it.
    pub async fn wait_for(
        &mut self,
        mut done: impl FnMut(&ViewSnapshot<T>) -> bool,
    ) -> Option<Arc<ViewSnapshot<T>>> {
        let snapshot = self.snapshots.wait_for(|s| done(s)).await.ok()?;
        Some(Arc::clone(&snapshot))
    }

    /// Waits for the next notice. `None` once the view task has ended.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Returns a pending notice without waiting.
    pub fn try_notice(&mut self) -> Option<Notice> {
        self.notices.try_recv().ok()
    }

    /// Stops the view and waits until its subscription is released.
    ///
    /// Only the stream this view opened is closed; other views following the
    /// same topic on the same session are unaffected.
    pub async fn deactivate(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(topic = %self.topic, error = %e, "View task failed");
        }
    }
}

impl<T> Drop for LiveView<T> {
    fn drop(&mut self) {
        // The task releases the subscription on its own once shutdown fires.
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl<T> fmt::Debug for LiveView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveView")
            .field("topic", &self.topic)
            .field("revision", &self.snapshots.borrow().revision)
            .finish()
    }
}

/// State owned by the view task; the only writer of the list.
struct Worker<T> {
    collection: CollectionName,
    topic: Topic,
    options: ViewOptions,
    list: RecordList<T>,
    status: ViewStatus,
    revision: u64,
    snapshots: watch::Sender<Arc<ViewSnapshot<T>>>,
    notices: mpsc::UnboundedSender<Notice>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Worker<T>
where
    T: FromRecord + Keyed + Clone + Send + Sync + 'static,
{
    async fn run<S: Session>(mut self, session: Arc<S>, mut shutdown: oneshot::Receiver<()>) {
        let subscribed = tokio::select! {
            biased;
            _ = &mut shutdown => None,
            result = session.subscribe(&self.topic) => Some(result),
        };

        let mut stream = match subscribed {
            None => {
                self.release(None::<S::Subscription>);
                return;
            }
            Some(Ok(stream)) => Some(stream),
            Some(Err(e)) => {
                self.fail(format!("failed to subscribe to {}: {}", self.topic, e));
                None
            }
        };

        // Events arriving while the snapshot loads are replayed after it.
        let mut buffered: Vec<RawChange> = Vec::new();
        let mut stream_ended = false;
        let snapshot = {
            let fetch = session.get_full_list(&self.collection, &self.options.query);
            tokio::pin!(fetch);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => {
                        debug!(topic = %self.topic, "Snapshot discarded at teardown");
                        self.release(stream);
                        return;
                    }
                    event = next_change(&mut stream), if !stream_ended => match event {
                        Some(Ok(change)) => buffered.push(change),
                        Some(Err(e)) => self.notify(Notice::error(format!("{}: {}", self.topic, e))),
                        None => stream_ended = true,
                    },
                    result = &mut fetch => break result,
                }
            }
        };

        match snapshot {
            Ok(records) => {
                let items: Vec<T> = records
                    .into_iter()
                    .filter(|r| self.options.keeps(r))
                    .filter_map(|r| self.decode(r))
                    .collect();
                debug!(topic = %self.topic, count = items.len(), buffered = buffered.len(), "Snapshot loaded");
                self.list.initialize(items);
                self.status = ViewStatus::Ready;
            }
            Err(e) => {
                self.fail(format!("failed to load {}: {}", self.collection, e));
            }
        }

        for change in buffered {
            self.apply(change);
        }
        if stream_ended {
            stream = None;
            self.fail(format!("realtime updates for {} stopped", self.collection));
        } else if stream.is_none() {
            self.status = ViewStatus::Stale;
        }
        self.publish();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                event = next_change(&mut stream) => match event {
                    Some(Ok(change)) => {
                        self.apply(change);
                        self.publish();
                    }
                    Some(Err(e)) => self.notify(Notice::error(format!("{}: {}", self.topic, e))),
                    None => stream_ended = true,
                },
            }

            if stream_ended && stream.is_some() {
                stream = None;
                self.fail(format!("realtime updates for {} stopped", self.collection));
                self.publish();
            }
        }

        self.release(stream);
    }

    fn apply(&mut self, change: RawChange) {
        let label = change.record.label().to_string();
        let action = change.action;

        let event = match action {
            ChangeAction::Create | ChangeAction::Update if !self.options.keeps(&change.record) => {
                ChangeEvent::Deleted(change.record.id)
            }
            _ => match change.into_event::<T>() {
                Ok(event) => event,
                Err(e) => {
                    warn!(topic = %self.topic, error = %e, "Skipping malformed change");
                    self.notify(Notice::error(format!("{} {}: {}", self.collection, action, e)));
                    return;
                }
            },
        };

        let outcome = self.list.apply(event);
        debug!(topic = %self.topic, %action, ?outcome, "Applied change");
        if outcome.is_change() {
            self.notify(Notice::info(format!("{} {}: {}", self.collection, action, label)));
        }
    }

    fn decode(&self, record: Record) -> Option<T> {
        let id = record.id.clone();
        match T::from_record(record) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(topic = %self.topic, %id, error = %e, "Skipping malformed record");
                self.notify(Notice::error(format!("{} {}: {}", self.collection, id, e)));
                None
            }
        }
    }

    fn fail(&mut self, message: String) {
        warn!(topic = %self.topic, "{}", message);
        self.status = ViewStatus::Stale;
        self.notify(Notice::error(message));
    }

    fn notify(&self, notice: Notice) {
        // The view handle may already be gone; notices are best effort.
        let _ = self.notices.send(notice);
    }

    fn publish(&mut self) {
        self.revision += 1;
        let items = self.list.as_slice().to_vec();
        let recent = match self.options.recent_limit {
            Some(n) => bounded_recent(&items, n),
            None => Vec::new(),
        };
        self.snapshots.send_replace(Arc::new(ViewSnapshot {
            items,
            recent,
            status: self.status,
            revision: self.revision,
        }));
    }

    /// Releases this view's own stream. Other views on the same topic keep theirs.
    fn release<St>(&self, stream: Option<St>) {
        drop(stream);
        info!(topic = %self.topic, "View deactivated");
    }
}

/// Next item of an optional stream; never resolves when there is none.
fn next_change<St>(stream: &mut Option<St>) -> impl Future<Output = Option<St::Item>> + '_
where
    St: futures_core::Stream + Unpin,
{
    async move {
        match stream.as_mut() {
            Some(s) => s.next().await,
            None => std::future::pending().await,
        }
    }
}
