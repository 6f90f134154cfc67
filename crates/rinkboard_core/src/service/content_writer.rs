//! Background persistence of capture-surface content.
//!
//! # Responsibility
//! - Accept content-change notifications without blocking the caller.
//! - Persist them on a dedicated writer thread that owns its own connection.
//! - Coalesce queued writes per drawing so a burst of stroke events costs one
//!   commit.
//!
//! # Invariants
//! - For one drawing, the last submitted payload is the one persisted.
//! - Every batch is one commit. A failed batch is logged, and the next
//!   `flush` reports it as [`ContentWriterError::Commit`]; the next
//!   notification for the drawing carries the full content again.
//! - `flush` returns only after everything submitted before it is committed.
//! - Shutdown persists every write queued ahead of the shutdown request and
//!   any that arrive while the final batch is being drained.

use crate::db::{open_db, DbError};
use crate::model::drawing::DrawingId;
use crate::repo::change_feed::{ChangeFeed, StoreEvent};
use crate::repo::entity_store::{ChangeSet, EntityStore, SqliteEntityStore};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

const WRITER_THREAD_NAME: &str = "rinkboard-content-writer";

/// Content lost because its batch failed to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFailure {
    /// Drawings whose queued content was not saved.
    pub dropped: Vec<DrawingId>,
    /// Message of the most recent store error.
    pub reason: String,
}

impl CommitFailure {
    fn absorb(&mut self, later: CommitFailure) {
        for id in later.dropped {
            if !self.dropped.contains(&id) {
                self.dropped.push(id);
            }
        }
        self.reason = later.reason;
    }
}

/// Errors from the content writer handle.
#[derive(Debug)]
pub enum ContentWriterError {
    /// Opening the writer connection failed.
    Open(DbError),
    /// Spawning the writer thread failed.
    Spawn(std::io::Error),
    /// At least one batch since the previous flush failed to commit.
    Commit(CommitFailure),
    /// The writer thread is gone; nothing more will be persisted.
    Closed,
}

impl Display for ContentWriterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "content writer open failed: {err}"),
            Self::Spawn(err) => write!(f, "content writer spawn failed: {err}"),
            Self::Commit(failure) => write!(
                f,
                "content for {} drawing(s) was not saved: {}",
                failure.dropped.len(),
                failure.reason
            ),
            Self::Closed => write!(f, "content writer is closed"),
        }
    }
}

impl Error for ContentWriterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) => Some(err),
            Self::Spawn(err) => Some(err),
            Self::Commit(_) | Self::Closed => None,
        }
    }
}

enum WriterCommand {
    Write {
        drawing_id: DrawingId,
        content: Vec<u8>,
    },
    Flush(Sender<Result<(), CommitFailure>>),
    Shutdown,
}

/// Cloneable, `Send` handle used by capture callbacks to queue content.
#[derive(Clone)]
pub struct ContentSink {
    tx: Sender<WriterCommand>,
}

impl ContentSink {
    /// Queues the full current content of one drawing. Never blocks on I/O.
    ///
    /// `Ok` means the writer accepted the payload; it is persisted unless a
    /// later `flush` reports a commit failure. A submit that races the final
    /// drain of a dropped [`ContentWriter`] may still be lost; once the
    /// writer thread has exited this returns [`ContentWriterError::Closed`].
    pub fn submit(&self, drawing_id: DrawingId, content: Vec<u8>) -> Result<(), ContentWriterError> {
        self.tx
            .send(WriterCommand::Write {
                drawing_id,
                content,
            })
            .map_err(|_| ContentWriterError::Closed)
    }
}

/// Owner of the writer thread. Dropping it drains the queue and joins.
pub struct ContentWriter {
    tx: Sender<WriterCommand>,
    handle: Option<JoinHandle<()>>,
}

impl ContentWriter {
    /// Opens a dedicated connection to `path` and starts the writer thread.
    pub fn spawn(path: impl AsRef<Path>, feed: ChangeFeed) -> Result<Self, ContentWriterError> {
        let conn = open_db(path).map_err(ContentWriterError::Open)?;
        Self::spawn_with_connection(conn, feed)
    }

    /// Starts the writer thread on an already-open, migrated connection.
    pub fn spawn_with_connection(
        conn: Connection,
        feed: ChangeFeed,
    ) -> Result<Self, ContentWriterError> {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || run_writer(conn, rx, feed))
            .map_err(ContentWriterError::Spawn)?;

        info!("event=content_writer_start module=service status=ok");
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Returns a sink for capture callbacks.
    pub fn sink(&self) -> ContentSink {
        ContentSink {
            tx: self.tx.clone(),
        }
    }

    /// Blocks until every write submitted before this call is committed.
    ///
    /// # Errors
    /// - [`ContentWriterError::Commit`] when any batch since the previous
    ///   flush failed; the failure is reported once.
    /// - [`ContentWriterError::Closed`] when the writer thread is gone.
    pub fn flush(&self) -> Result<(), ContentWriterError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(WriterCommand::Flush(reply_tx))
            .map_err(|_| ContentWriterError::Closed)?;
        match reply_rx.recv() {
            Ok(outcome) => outcome.map_err(ContentWriterError::Commit),
            Err(_) => Err(ContentWriterError::Closed),
        }
    }
}

impl Drop for ContentWriter {
    fn drop(&mut self) {
        let _ = self.tx.send(WriterCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("event=content_writer_stop module=service status=error error_code=writer_panicked");
            }
        }
    }
}

/// Pending payloads in first-submission order, one per drawing.
#[derive(Default)]
struct PendingWrites {
    entries: Vec<(DrawingId, Vec<u8>)>,
    coalesced: usize,
}

impl PendingWrites {
    fn push(&mut self, drawing_id: DrawingId, content: Vec<u8>) {
        match self.entries.iter_mut().find(|(id, _)| *id == drawing_id) {
            Some(entry) => {
                entry.1 = content;
                self.coalesced += 1;
            }
            None => self.entries.push((drawing_id, content)),
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn run_writer(conn: Connection, rx: Receiver<WriterCommand>, feed: ChangeFeed) {
    let store = match SqliteEntityStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => {
            error!("event=content_writer_start module=service status=error error={err}");
            return;
        }
    };

    let mut unreported: Option<CommitFailure> = None;
    while let Ok(first) = rx.recv() {
        let mut pending = PendingWrites::default();
        let mut flush_waiters = Vec::new();
        let mut shutdown = false;

        // Keep draining after Shutdown so writes queued behind it still land.
        for command in std::iter::once(first).chain(rx.try_iter()) {
            match command {
                WriterCommand::Write {
                    drawing_id,
                    content,
                } => pending.push(drawing_id, content),
                WriterCommand::Flush(reply) => flush_waiters.push(reply),
                WriterCommand::Shutdown => shutdown = true,
            }
        }

        if !pending.is_empty() {
            if let Err(failure) = persist_batch(&store, pending, &feed) {
                match unreported.as_mut() {
                    Some(earlier) => earlier.absorb(failure),
                    None => unreported = Some(failure),
                }
            }
        }
        if !flush_waiters.is_empty() {
            let outcome = unreported.take().map_or(Ok(()), Err);
            for waiter in flush_waiters {
                let _ = waiter.send(outcome.clone());
            }
        }
        if shutdown {
            break;
        }
    }

    match unreported {
        Some(failure) => warn!(
            "event=content_writer_stop module=service status=degraded unsaved_drawings={}",
            failure.dropped.len()
        ),
        None => info!("event=content_writer_stop module=service status=ok"),
    }
}

fn persist_batch(
    store: &SqliteEntityStore<'_>,
    pending: PendingWrites,
    feed: &ChangeFeed,
) -> Result<(), CommitFailure> {
    let coalesced = pending.coalesced;
    let mut changes = ChangeSet::new();
    let mut drawing_ids = Vec::with_capacity(pending.entries.len());
    for (drawing_id, content) in pending.entries {
        drawing_ids.push(drawing_id);
        changes.set_drawing_content(drawing_id, content);
    }

    match store.commit(&changes) {
        Ok(receipt) => {
            for missed in &receipt.missed_content {
                warn!(
                    "event=content_writer_commit module=service status=miss drawing_id={missed}"
                );
            }
            let events: Vec<StoreEvent> = drawing_ids
                .into_iter()
                .filter(|id| !receipt.missed_content.contains(id))
                .map(StoreEvent::DrawingContentChanged)
                .collect();
            debug!(
                "event=content_writer_commit module=service status=ok written={} coalesced={}",
                events.len(),
                coalesced
            );
            feed.publish(&events);
            Ok(())
        }
        Err(err) => {
            error!(
                "event=content_writer_commit module=service status=error dropped={} error={}",
                changes.len(),
                err
            );
            Err(CommitFailure {
                dropped: drawing_ids,
                reason: err.to_string(),
            })
        }
    }
}
