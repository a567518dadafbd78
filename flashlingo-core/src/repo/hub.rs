use crate::{sort_newest_first, UserId, VocabEntry};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// A full, newest-first copy of one user's collection.
pub type Snapshot = Arc<Vec<VocabEntry>>;

/// Receiving end of a user's snapshot feed.
///
/// Only the most recent snapshot is retained; a slow reader skips straight to
/// the latest one.
#[derive(Clone, Debug)]
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    pub fn latest(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// Non-blocking: the newest snapshot if one arrived since the last look.
    pub fn try_changed(&mut self) -> Option<Snapshot> {
        if self.rx.has_changed().unwrap_or(false) {
            Some(self.rx.borrow_and_update().clone())
        } else {
            None
        }
    }

    /// Waits for the next snapshot. `None` once the repository is gone.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// One watch channel per user, shared by the repository backends.
#[derive(Default)]
pub struct SnapshotHub {
    channels: Mutex<HashMap<UserId, watch::Sender<Snapshot>>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, user: &UserId, mut entries: Vec<VocabEntry>) {
        sort_newest_first(&mut entries);
        let snapshot = Arc::new(entries);
        let mut channels = self.channels.lock();
        match channels.get(user) {
            Some(tx) => {
                tx.send_replace(snapshot);
            }
            None => {
                let (tx, _) = watch::channel(snapshot);
                channels.insert(user.clone(), tx);
            }
        }
    }

    pub fn has_feed(&self, user: &UserId) -> bool {
        self.channels.lock().contains_key(user)
    }

    /// Subscribes to an already-published feed.
    pub fn try_subscribe(&self, user: &UserId) -> Option<Subscription> {
        self.channels
            .lock()
            .get(user)
            .map(|tx| Subscription { rx: tx.subscribe() })
    }

    /// Subscribes, seeding the feed with `current` if nothing was published yet.
    /// A snapshot published in the meantime wins over `current`.
    pub fn subscribe_with(&self, user: &UserId, current: Vec<VocabEntry>) -> Subscription {
        let mut channels = self.channels.lock();
        let tx = channels.entry(user.clone()).or_insert_with(|| {
            let mut entries = current;
            sort_newest_first(&mut entries);
            watch::channel(Arc::new(entries)).0
        });
        Subscription { rx: tx.subscribe() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntryDraft;

    fn entry(src: &str) -> VocabEntry {
        VocabEntry::new(EntryDraft::new(src, "x", None).validate().unwrap())
    }

    #[test]
    fn published_snapshot_wins_over_seed() {
        let hub = SnapshotHub::new();
        let user = UserId::local();
        assert!(!hub.has_feed(&user));
        hub.publish(&user, vec![entry("fresh")]);
        let sub = hub.subscribe_with(&user, vec![entry("stale"), entry("stale2")]);
        assert_eq!(sub.latest().len(), 1);
        assert_eq!(sub.latest()[0].source_text, "fresh");
    }

    #[test]
    fn seed_used_when_nothing_published() {
        let hub = SnapshotHub::new();
        let user = UserId::local();
        let sub = hub.subscribe_with(&user, vec![entry("a"), entry("b")]);
        assert_eq!(sub.latest().len(), 2);
        assert!(hub.has_feed(&user));
    }
}
