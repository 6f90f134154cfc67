//! Commit notifications for listing refresh.
//!
//! # Responsibility
//! - Broadcast what each successful commit changed to registered listeners.
//! - Expose a monotonically increasing revision for poll-style consumers.
//!
//! # Invariants
//! - Events are published only after the commit that produced them succeeded.
//! - The revision increases by one per published batch.
//! - Listeners run without the feed lock held, so they may read the revision,
//!   subscribe, unsubscribe or publish.
//! - Events reach listeners in publish order. An event published while a
//!   dispatch is in progress is queued and delivered by that dispatch.

use crate::model::drawing::DrawingId;
use crate::model::folder::FolderId;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Committed change observed by listing consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    FolderCreated(FolderId),
    FolderRenamed(FolderId),
    FolderDeleted {
        folder_id: FolderId,
        deleted_drawings: Vec<DrawingId>,
        detached_drawings: Vec<DrawingId>,
    },
    DrawingCreated {
        drawing_id: DrawingId,
        folder_id: Option<FolderId>,
    },
    DrawingDeleted(DrawingId),
    DrawingMoved {
        drawing_id: DrawingId,
        folder_id: Option<FolderId>,
    },
    DrawingContentChanged(DrawingId),
}

/// Handle returned by [`ChangeFeed::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent) + Send>;

#[derive(Default)]
struct FeedState {
    revision: u64,
    next_subscription: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    queue: VecDeque<StoreEvent>,
    dispatching: bool,
    /// Listeners currently moved out for dispatch.
    in_flight: Vec<SubscriptionId>,
    /// In-flight listeners unsubscribed during dispatch.
    removed: Vec<SubscriptionId>,
}

/// Shared, cloneable commit notification channel.
///
/// Clones share listeners and revision, so the UI thread and the content
/// writer thread can publish into one feed.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    state: Arc<Mutex<FeedState>>,
}

impl Debug for ChangeFeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ChangeFeed")
            .field("revision", &state.revision)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener invoked for every published event.
    pub fn subscribe(&self, listener: impl FnMut(&StoreEvent) + Send + 'static) -> SubscriptionId {
        let mut state = self.lock();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(current, _)| *current != id);
        if state.listeners.len() != before {
            return true;
        }
        if state.in_flight.contains(&id) && !state.removed.contains(&id) {
            state.removed.push(id);
            return true;
        }
        false
    }

    /// Number of committed batches published so far.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Publishes the events of one committed change set.
    pub fn publish(&self, events: &[StoreEvent]) {
        if events.is_empty() {
            return;
        }
        {
            let mut state = self.lock();
            state.revision += 1;
            state.queue.extend(events.iter().cloned());
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }
        self.dispatch();
    }

    fn dispatch(&self) {
        loop {
            let (events, listeners) = {
                let mut state = self.lock();
                if state.queue.is_empty() {
                    state.dispatching = false;
                    return;
                }
                let events: Vec<StoreEvent> = state.queue.drain(..).collect();
                let listeners = std::mem::take(&mut state.listeners);
                state.in_flight = listeners.iter().map(|(id, _)| *id).collect();
                (events, listeners)
            };

            let mut batch = InFlight {
                feed: self,
                listeners,
            };
            for event in &events {
                for (id, listener) in batch.listeners.iter_mut() {
                    if !self.lock().removed.contains(id) {
                        listener(event);
                    }
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        // A panicking listener must not disable notifications for everyone.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Listeners moved out of the feed for one dispatch round. Dropping it puts
/// them back ahead of anything subscribed meanwhile, even on unwind.
struct InFlight<'feed> {
    feed: &'feed ChangeFeed,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.feed.lock();
        let removed = std::mem::take(&mut state.removed);
        state.in_flight.clear();

        let mut restored = std::mem::take(&mut self.listeners);
        restored.retain(|(id, _)| !removed.contains(id));
        restored.append(&mut state.listeners);
        state.listeners = restored;

        if std::thread::panicking() {
            state.queue.clear();
            state.dispatching = false;
        }
    }
}
