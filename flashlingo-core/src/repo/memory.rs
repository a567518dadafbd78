use crate::{
    sort_newest_first, CoreError, EntryDraft, EntryId, SnapshotHub, Subscription, UserId,
    VocabEntry,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

type Collection = HashMap<EntryId, VocabEntry>;

#[derive(Default)]
pub struct MemoryRepo {
    users: RwLock<HashMap<UserId, Collection>>,
    hub: SnapshotHub,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self, user: &UserId) -> Vec<VocabEntry> {
        collection_of(&self.users.read(), user)
    }

    /// Called with the write lock still held, so snapshots go out in write order.
    fn publish(&self, user: &UserId, users: &HashMap<UserId, Collection>) {
        self.hub.publish(user, collection_of(users, user));
    }
}

fn collection_of(users: &HashMap<UserId, Collection>, user: &UserId) -> Vec<VocabEntry> {
    users
        .get(user)
        .map(|c| c.values().cloned().collect())
        .unwrap_or_default()
}

#[async_trait]
impl crate::repo::VocabRepository for MemoryRepo {
    async fn subscribe(&self, user: &UserId) -> Result<Subscription, CoreError> {
        if let Some(sub) = self.hub.try_subscribe(user) {
            return Ok(sub);
        }
        Ok(self.hub.subscribe_with(user, self.snapshot(user)))
    }

    async fn list(&self, user: &UserId) -> Result<Vec<VocabEntry>, CoreError> {
        let mut v = self.snapshot(user);
        sort_newest_first(&mut v);
        Ok(v)
    }

    async fn get(&self, user: &UserId, id: EntryId) -> Result<VocabEntry, CoreError> {
        self.users
            .read()
            .get(user)
            .and_then(|c| c.get(&id))
            .cloned()
            .ok_or(CoreError::NotFound("entry"))
    }

    async fn create(&self, user: &UserId, draft: &EntryDraft) -> Result<VocabEntry, CoreError> {
        let entry = VocabEntry::new(draft.validate()?);
        let mut users = self.users.write();
        users
            .entry(user.clone())
            .or_default()
            .insert(entry.id, entry.clone());
        debug!(%user, id = %entry.id, "entry created");
        self.publish(user, &users);
        Ok(entry)
    }

    async fn update(
        &self,
        user: &UserId,
        id: EntryId,
        draft: &EntryDraft,
    ) -> Result<VocabEntry, CoreError> {
        let valid = draft.validate()?;
        let mut users = self.users.write();
        let Some(entry) = users.get_mut(user).and_then(|c| c.get_mut(&id)) else {
            return Err(CoreError::NotFound("entry"));
        };
        entry.apply(valid);
        let updated = entry.clone();
        debug!(%user, %id, "entry updated");
        self.publish(user, &users);
        Ok(updated)
    }

    async fn delete(&self, user: &UserId, id: EntryId) -> Result<(), CoreError> {
        let mut users = self.users.write();
        users
            .get_mut(user)
            .and_then(|c| c.remove(&id))
            .ok_or(CoreError::NotFound("entry"))?;
        debug!(%user, %id, "entry deleted");
        self.publish(user, &users);
        Ok(())
    }
}
