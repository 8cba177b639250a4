// ── Snapshot subscriptions ──
//
// Read-only views of a session. Holders see whole snapshots, never the
// session's mutable state, and a slow holder only ever sees the newest one.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::SessionSnapshot;

/// A handle on the snapshots one session publishes.
///
/// Publishes are coalesced: a holder that falls behind jumps straight to
/// the newest snapshot, and the gap in `revision` says how many it missed.
pub struct SnapshotStream {
    last_seen: Arc<SessionSnapshot>,
    rx: watch::Receiver<Arc<SessionSnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(rx: watch::Receiver<Arc<SessionSnapshot>>) -> Self {
        let last_seen = rx.borrow().clone();
        Self { last_seen, rx }
    }

    /// What this handle last observed, either at subscription or through
    /// `changed` / `wait_for`.
    pub fn current(&self) -> &Arc<SessionSnapshot> {
        &self.last_seen
    }

    /// Newest snapshot, without marking it observed.
    pub fn latest(&self) -> Arc<SessionSnapshot> {
        self.rx.borrow().clone()
    }

    /// Next unobserved snapshot; `None` after the session is dropped.
    pub async fn changed(&mut self) -> Option<Arc<SessionSnapshot>> {
        self.rx.changed().await.ok()?;
        Some(self.observe())
    }

    /// First snapshot, starting with the newest, for which `pred` holds.
    pub async fn wait_for(
        &mut self,
        pred: impl Fn(&SessionSnapshot) -> bool,
    ) -> Option<Arc<SessionSnapshot>> {
        let hit = self.rx.wait_for(|s| pred(s)).await.ok()?.clone();
        self.last_seen = hit.clone();
        Some(hit)
    }

    /// Hand the receiver to a `Stream`; it yields the newest snapshot
    /// first.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.rx),
        }
    }

    fn observe(&mut self) -> Arc<SessionSnapshot> {
        self.last_seen = self.rx.borrow_and_update().clone();
        self.last_seen.clone()
    }
}

/// `SnapshotStream` as a `futures_core::Stream`. Ends with the session.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<SessionSnapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<SessionSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
