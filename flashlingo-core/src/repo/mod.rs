use crate::{CoreError, EntryDraft, EntryId, UserId, VocabEntry};
use async_trait::async_trait;

pub mod hub;
pub mod memory;

pub use hub::{Snapshot, SnapshotHub, Subscription};

/// Per-user vocabulary storage with change subscription.
///
/// `create` and `update` validate the draft (see [`EntryDraft::validate`]);
/// every successful write publishes the user's full collection to subscribers.
#[async_trait]
pub trait VocabRepository: Send + Sync {
    async fn subscribe(&self, user: &UserId) -> Result<Subscription, CoreError>;

    /// Newest first.
    async fn list(&self, user: &UserId) -> Result<Vec<VocabEntry>, CoreError>;
    async fn get(&self, user: &UserId, id: EntryId) -> Result<VocabEntry, CoreError>;

    async fn create(&self, user: &UserId, draft: &EntryDraft) -> Result<VocabEntry, CoreError>;
    async fn update(
        &self,
        user: &UserId,
        id: EntryId,
        draft: &EntryDraft,
    ) -> Result<VocabEntry, CoreError>;
    async fn delete(&self, user: &UserId, id: EntryId) -> Result<(), CoreError>;
}
