use chrono::{DateTime, SecondsFormat, Utc};
use flashlingo_core::{
    repo::VocabRepository, CoreError, EntryDraft, EntryId, SnapshotHub, Subscription, UserId,
    VocabEntry,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct SqliteRepo {
    pool: SqlitePool,
    /// Held from a write until its snapshot is published, so feeds see writes in order.
    writer: Mutex<()>,
    hub: SnapshotHub,
}

impl SqliteRepo {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|e| {
                warn!(error = %e, "sqlite connect failed");
                CoreError::Storage("sqlite connect")
            })?;
        info!(path = %path.as_ref().display(), "sqlite store opened");
        Self::with_pool(pool).await
    }

    pub async fn open_memory() -> Result<Self, CoreError> {
        // Each connection to :memory: is its own database, so keep exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, CoreError> {
        let repo = Self {
            pool,
            writer: Mutex::new(()),
            hub: SnapshotHub::new(),
        };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS entries (
          id           TEXT PRIMARY KEY,
          user_id      TEXT NOT NULL,
          source_text  TEXT NOT NULL,
          target_text  TEXT NOT NULL,
          topic        TEXT NOT NULL,
          created_at   TEXT NOT NULL,
          mastered     INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_entries_user_created ON entries (user_id, created_at);
        "#;

        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("sqlite schema"))?;
        }
        Ok(())
    }

    async fn fetch_all(&self, user: &UserId) -> Result<Vec<VocabEntry>, CoreError> {
        let rows = sqlx::query(
            r#"SELECT id,source_text,target_text,topic,created_at,mastered
               FROM entries WHERE user_id=? ORDER BY created_at DESC, id ASC"#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("list entries"))?;
        rows.into_iter().map(row_into_entry).collect()
    }

    /// Pushes the user's collection after a committed write. A failed re-read
    /// is logged, not returned: the write itself already happened.
    async fn publish(&self, user: &UserId) {
        match self.fetch_all(user).await {
            Ok(entries) => self.hub.publish(user, entries),
            Err(e) => warn!(%user, error = %e, "snapshot refresh failed"),
        }
    }
}

#[async_trait::async_trait]
impl VocabRepository for SqliteRepo {
    async fn subscribe(&self, user: &UserId) -> Result<Subscription, CoreError> {
        if let Some(sub) = self.hub.try_subscribe(user) {
            return Ok(sub);
        }
        let current = self.fetch_all(user).await?;
        Ok(self.hub.subscribe_with(user, current))
    }

    async fn list(&self, user: &UserId) -> Result<Vec<VocabEntry>, CoreError> {
        self.fetch_all(user).await
    }

    async fn get(&self, user: &UserId, id: EntryId) -> Result<VocabEntry, CoreError> {
        let row = sqlx::query(
            r#"SELECT id,source_text,target_text,topic,created_at,mastered
               FROM entries WHERE user_id=? AND id=?"#,
        )
        .bind(user.as_str())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("read entry"))?;
        let row = row.ok_or(CoreError::NotFound("entry"))?;
        row_into_entry(row)
    }

    async fn create(&self, user: &UserId, draft: &EntryDraft) -> Result<VocabEntry, CoreError> {
        let entry = VocabEntry::new(draft.validate()?);
        let _writing = self.writer.lock().await;
        sqlx::query(
            r#"INSERT INTO entries (id,user_id,source_text,target_text,topic,created_at,mastered)
               VALUES (?,?,?,?,?,?,?)"#,
        )
        .bind(entry.id.to_string())
        .bind(user.as_str())
        .bind(&entry.source_text)
        .bind(&entry.target_text)
        .bind(&entry.topic)
        .bind(dt_to_str(entry.created_at))
        .bind(bool_to_i(entry.mastered))
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("insert entry"))?;
        debug!(%user, id = %entry.id, "entry created");
        self.publish(user).await;
        Ok(entry)
    }

    async fn update(
        &self,
        user: &UserId,
        id: EntryId,
        draft: &EntryDraft,
    ) -> Result<VocabEntry, CoreError> {
        let valid = draft.validate()?;
        let _writing = self.writer.lock().await;
        let mut updated = self.get(user, id).await?;
        let res = sqlx::query(
            r#"UPDATE entries SET source_text=?, target_text=?, topic=?
               WHERE user_id=? AND id=?"#,
        )
        .bind(&valid.source_text)
        .bind(&valid.target_text)
        .bind(&valid.topic)
        .bind(user.as_str())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("update entry"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("entry"));
        }
        debug!(%user, %id, "entry updated");
        updated.apply(valid);
        self.publish(user).await;
        Ok(updated)
    }

    async fn delete(&self, user: &UserId, id: EntryId) -> Result<(), CoreError> {
        let _writing = self.writer.lock().await;
        let res = sqlx::query("DELETE FROM entries WHERE user_id=? AND id=?")
            .bind(user.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("delete entry"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("entry"));
        }
        debug!(%user, %id, "entry deleted");
        self.publish(user).await;
        Ok(())
    }
}

// ===== Helpers =====
fn uuid_from_str(s: String) -> Result<uuid::Uuid, CoreError> {
    uuid::Uuid::parse_str(&s).map_err(|_| CoreError::Storage("bad uuid column"))
}

/// Fixed-width RFC 3339 so the text column sorts chronologically.
fn dt_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn dt_from_str(s: String) -> Result<DateTime<Utc>, CoreError> {
    DateTime::parse_from_rfc3339(&s)
        .map_err(|_| CoreError::Storage("bad datetime column"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn bool_to_i(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

fn row_into_entry(row: SqliteRow) -> Result<VocabEntry, CoreError> {
    Ok(VocabEntry {
        id: uuid_from_str(row.get::<String, _>("id"))?,
        source_text: row.get::<String, _>("source_text"),
        target_text: row.get::<String, _>("target_text"),
        topic: row.get::<String, _>("topic"),
        created_at: dt_from_str(row.get::<String, _>("created_at"))?,
        mastered: row.get::<i64, _>("mastered") != 0,
    })
}
