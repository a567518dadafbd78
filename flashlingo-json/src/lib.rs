use chrono::{DateTime, Utc};
use flashlingo_core::{
    repo::VocabRepository, sort_newest_first, CoreError, EntryDraft, EntryId, SnapshotHub,
    Subscription, UserId, VocabEntry,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, info, warn};

pub mod paths;

const FILE_VERSION: u32 = 1;

#[derive(Clone, Serialize, Deserialize)]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    users: BTreeMap<UserId, Vec<VocabEntry>>,
}

type Collection = HashMap<EntryId, VocabEntry>;

#[derive(Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    users: HashMap<UserId, Collection>,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            users: HashMap::new(),
        }
    }

    fn to_image(&self) -> FileImage {
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            users: self
                .users
                .iter()
                .map(|(user, entries)| {
                    let mut v: Vec<VocabEntry> = entries.values().cloned().collect();
                    sort_newest_first(&mut v);
                    (user.clone(), v)
                })
                .collect(),
        }
    }

    fn from_image(img: FileImage) -> Self {
        let users = img
            .users
            .into_iter()
            .map(|(user, entries)| (user, entries.into_iter().map(|e| (e.id, e)).collect()))
            .collect();
        Self {
            created_at: img.created_at,
            updated_at: img.updated_at,
            users,
        }
    }

    fn entries(&self, user: &UserId) -> Vec<VocabEntry> {
        self.users
            .get(user)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// Whole-file JSON repository. Every write rewrites the file atomically and
/// drops a timestamped copy into the backups directory.
///
/// Writes are serialized by `writer`. Each one edits a copy of the state, and
/// the copy replaces `state` only once it is on disk.
pub struct JsonStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
    writer: Mutex<()>,
    hub: SnapshotHub,
}

impl JsonStore {
    pub async fn open_default() -> Result<Self, CoreError> {
        let (file, backups) = paths::default_store_file();
        Self::open_with(file, backups, 10).await
    }

    pub async fn open_with(
        path: PathBuf,
        backups_dir: PathBuf,
        max_backups: usize,
    ) -> Result<Self, CoreError> {
        ensure_parent_dirs(&path)?;
        ensure_dir(&backups_dir)?;
        let state = load_or_init(&path, &backups_dir).await?;
        info!(path = %path.display(), users = state.users.len(), "json store opened");
        Ok(Self {
            path,
            backups_dir,
            max_backups: max_backups.max(1),
            state: RwLock::new(state),
            writer: Mutex::new(()),
            hub: SnapshotHub::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy of the state, persists the copy, then swaps
    /// it in and publishes `user`'s collection. On error nothing changes.
    async fn commit<T>(
        &self,
        user: &UserId,
        change: impl FnOnce(&mut State) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let _writing = self.writer.lock().await;
        let mut next = self.state.read().clone();
        let out = change(&mut next)?;
        next.updated_at = Utc::now();

        let image = next.to_image();
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;
        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &image))
            .await
            .map_err(|_| CoreError::Storage("io"))?
            .map_err(|e| {
                warn!(error = %e, "json store write failed");
                CoreError::Storage("io")
            })?;

        let entries = next.entries(user);
        *self.state.write() = next;
        self.hub.publish(user, entries);
        Ok(out)
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(path).map_err(|_| CoreError::Storage("io"))
}

async fn load_or_init(path: &Path, backups_dir: &Path) -> Result<State, CoreError> {
    if path.exists() {
        let p = path.to_path_buf();
        let img: FileImage = task::spawn_blocking(move || {
            let mut f = fs::File::open(&p)?;
            let mut buf = String::new();
            f.read_to_string(&mut buf)?;
            let v = serde_json::from_str::<FileImage>(&buf)?;
            Ok::<FileImage, std::io::Error>(v)
        })
        .await
        .map_err(|_| CoreError::Storage("io"))
        .and_then(|r| {
            r.map_err(|e| {
                warn!(error = %e, "json store unreadable");
                CoreError::Storage("io")
            })
        })?;
        if img.version != FILE_VERSION {
            return Err(CoreError::Storage("unsupported file version"));
        }
        Ok(State::from_image(img))
    } else {
        let st = State::new_empty();
        let img = st.to_image();
        write_with_backup(path, backups_dir, 1, &img).map_err(|_| CoreError::Storage("io"))?;
        Ok(st)
    }
}

fn write_with_backup(
    path: &Path,
    backups_dir: &Path,
    max_backups: usize,
    img: &FileImage,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(backups_dir)?;

    let json = serde_json::to_vec_pretty(img)?;

    // Backup first: a failure here leaves the main file untouched.
    let backup_path = backups_dir.join(backup_name(Utc::now()));
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(&json)?;
    btmp.flush()?;
    btmp.persist(&backup_path).map_err(|e| e.error)?;

    let mut tmp = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    if let Err(e) = rotate_backups(backups_dir, max_backups) {
        warn!(error = %e, "backup rotation failed");
    }
    Ok(())
}

/// UTC keeps name order equal to write order across offset changes.
fn backup_name(at: DateTime<Utc>) -> String {
    format!("flashlingo-{}.json", at.format("%Y%m%d-%H%M%S%.3f"))
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), std::io::Error> {
    let mut entries: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    // Names embed the timestamp, so name order is age order.
    entries.sort_by_key(|e| e.file_name());
    if entries.len() > keep {
        for e in &entries[0..entries.len() - keep] {
            let _ = fs::remove_file(e.path());
        }
    }
    Ok(())
}

use async_trait::async_trait;

#[async_trait]
impl VocabRepository for JsonStore {
    async fn subscribe(&self, user: &UserId) -> Result<Subscription, CoreError> {
        if let Some(sub) = self.hub.try_subscribe(user) {
            return Ok(sub);
        }
        let current = self.state.read().entries(user);
        Ok(self.hub.subscribe_with(user, current))
    }

    async fn list(&self, user: &UserId) -> Result<Vec<VocabEntry>, CoreError> {
        let mut v = self.state.read().entries(user);
        sort_newest_first(&mut v);
        Ok(v)
    }

    async fn get(&self, user: &UserId, id: EntryId) -> Result<VocabEntry, CoreError> {
        let s = self.state.read();
        s.users
            .get(user)
            .and_then(|c| c.get(&id))
            .cloned()
            .ok_or(CoreError::NotFound("entry"))
    }

    async fn create(&self, user: &UserId, draft: &EntryDraft) -> Result<VocabEntry, CoreError> {
        let entry = VocabEntry::new(draft.validate()?);
        self.commit(user, |s| {
            s.users
                .entry(user.clone())
                .or_default()
                .insert(entry.id, entry.clone());
            Ok(())
        })
        .await?;
        debug!(%user, id = %entry.id, "entry created");
        Ok(entry)
    }

    async fn update(
        &self,
        user: &UserId,
        id: EntryId,
        draft: &EntryDraft,
    ) -> Result<VocabEntry, CoreError> {
        let valid = draft.validate()?;
        let updated = self
            .commit(user, |s| {
                let e = s
                    .users
                    .get_mut(user)
                    .and_then(|c| c.get_mut(&id))
                    .ok_or(CoreError::NotFound("entry"))?;
                e.apply(valid);
                Ok(e.clone())
            })
            .await?;
        debug!(%user, %id, "entry updated");
        Ok(updated)
    }

    async fn delete(&self, user: &UserId, id: EntryId) -> Result<(), CoreError> {
        self.commit(user, |s| {
            s.users
                .get_mut(user)
                .and_then(|c| c.remove(&id))
                .map(|_| ())
                .ok_or(CoreError::NotFound("entry"))
        })
        .await?;
        debug!(%user, %id, "entry deleted");
        Ok(())
    }
}
