use chrono::{DateTime, SubsecRound, Utc};
use flashlingo_core::{
    repo::VocabRepository, CoreError, EntryDraft, EntryId, SnapshotHub, Subscription, UserId,
    VocabEntry,
};
use sqlx::{
    postgres::{PgListener, PgPoolOptions, PgRow},
    PgPool, Row,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Channel the entries trigger notifies on; the payload is the user id.
const CHANGE_CHANNEL: &str = "flashlingo_entries";

pub struct PostgresRepo {
    pool: PgPool,
    /// Held by writers and the change listener from query to publish, so an
    /// older snapshot never replaces a newer one.
    feed_lock: Arc<Mutex<()>>,
    hub: Arc<SnapshotHub>,
    listener: Option<JoinHandle<()>>,
}

impl PostgresRepo {
    /// Connects, ensures the schema, and starts following changes made by
    /// other processes.
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| {
                warn!(error = %e, "pg connect failed");
                CoreError::Storage("pg connect")
            })?;
        let mut repo = Self {
            pool,
            feed_lock: Arc::new(Mutex::new(())),
            hub: Arc::new(SnapshotHub::new()),
            listener: None,
        };
        repo.ensure_schema().await?;
        repo.listener = Some(repo.spawn_listener().await?);
        info!("postgres store connected");
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        // Function bodies contain ';', so these run one by one rather than split.
        const STATEMENTS: &[&str] = &[
            r#"
            CREATE TABLE IF NOT EXISTS vocab_entries (
              id           uuid PRIMARY KEY,
              user_id      text NOT NULL,
              source_text  text NOT NULL CHECK (length(btrim(source_text)) > 0),
              target_text  text NOT NULL CHECK (length(btrim(target_text)) > 0),
              topic        text NOT NULL,
              created_at   timestamptz NOT NULL,
              mastered     boolean NOT NULL DEFAULT false
            )"#,
            "CREATE INDEX IF NOT EXISTS idx_vocab_user_created \
             ON vocab_entries (user_id, created_at)",
            r#"
            CREATE OR REPLACE FUNCTION flashlingo_notify_entries() RETURNS trigger AS $$
            BEGIN
              PERFORM pg_notify('flashlingo_entries', COALESCE(NEW.user_id, OLD.user_id));
              RETURN NULL;
            END;
            $$ LANGUAGE plpgsql"#,
            "DROP TRIGGER IF EXISTS vocab_entries_notify ON vocab_entries",
            r#"
            CREATE TRIGGER vocab_entries_notify
              AFTER INSERT OR UPDATE OR DELETE ON vocab_entries
              FOR EACH ROW EXECUTE FUNCTION flashlingo_notify_entries()"#,
        ];

        for sql in STATEMENTS.iter().copied() {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("pg schema"))?;
        }
        Ok(())
    }

    async fn spawn_listener(&self) -> Result<JoinHandle<()>, CoreError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg listen"))?;
        listener
            .listen(CHANGE_CHANNEL)
            .await
            .map_err(|_| CoreError::Storage("pg listen"))?;

        let pool = self.pool.clone();
        let hub = Arc::clone(&self.hub);
        let feed_lock = Arc::clone(&self.feed_lock);
        Ok(tokio::spawn(async move {
            loop {
                let note = match listener.recv().await {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(error = %e, "pg change feed interrupted");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };
                let Ok(user) = UserId::new(note.payload()) else {
                    continue;
                };
                // No feed for this user in this process yet.
                if !hub.has_feed(&user) {
                    continue;
                }
                let _feed = feed_lock.lock().await;
                match fetch_all(&pool, &user).await {
                    Ok(entries) => hub.publish(&user, entries),
                    Err(e) => warn!(error = %e, %user, "pg snapshot refresh failed"),
                }
            }
        }))
    }

    /// Runs after a committed write, so a failed re-read is only logged.
    async fn publish(&self, user: &UserId) {
        match fetch_all(&self.pool, user).await {
            Ok(entries) => self.hub.publish(user, entries),
            Err(e) => warn!(error = %e, %user, "pg snapshot refresh failed"),
        }
    }
}

impl Drop for PostgresRepo {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.abort();
        }
    }
}

async fn fetch_all(pool: &PgPool, user: &UserId) -> Result<Vec<VocabEntry>, CoreError> {
    let rows = sqlx::query(
        r#"SELECT id,source_text,target_text,topic,created_at,mastered
           FROM vocab_entries WHERE user_id=$1 ORDER BY created_at DESC, id ASC"#,
    )
    .bind(user.as_str())
    .fetch_all(pool)
    .await
    .map_err(|_| CoreError::Storage("pg list entries"))?;
    Ok(rows.into_iter().map(row_into_entry).collect())
}

#[async_trait::async_trait]
impl VocabRepository for PostgresRepo {
    async fn subscribe(&self, user: &UserId) -> Result<Subscription, CoreError> {
        if let Some(sub) = self.hub.try_subscribe(user) {
            return Ok(sub);
        }
        let current = fetch_all(&self.pool, user).await?;
        Ok(self.hub.subscribe_with(user, current))
    }

    async fn list(&self, user: &UserId) -> Result<Vec<VocabEntry>, CoreError> {
        fetch_all(&self.pool, user).await
    }

    async fn get(&self, user: &UserId, id: EntryId) -> Result<VocabEntry, CoreError> {
        let row = sqlx::query(
            r#"SELECT id,source_text,target_text,topic,created_at,mastered
               FROM vocab_entries WHERE user_id=$1 AND id=$2"#,
        )
        .bind(user.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg read entry"))?;
        let row = row.ok_or(CoreError::NotFound("entry"))?;
        Ok(row_into_entry(row))
    }

    async fn create(&self, user: &UserId, draft: &EntryDraft) -> Result<VocabEntry, CoreError> {
        let mut entry = VocabEntry::new(draft.validate()?);
        // timestamptz keeps microseconds.
        entry.created_at = entry.created_at.trunc_subsecs(6);
        let _feed = self.feed_lock.lock().await;
        sqlx::query(
            r#"INSERT INTO vocab_entries
                 (id,user_id,source_text,target_text,topic,created_at,mastered)
               VALUES ($1,$2,$3,$4,$5,$6,$7)"#,
        )
        .bind(entry.id)
        .bind(user.as_str())
        .bind(&entry.source_text)
        .bind(&entry.target_text)
        .bind(&entry.topic)
        .bind(entry.created_at)
        .bind(entry.mastered)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg insert entry"))?;
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
        let _feed = self.feed_lock.lock().await;
        let row = sqlx::query(
            r#"UPDATE vocab_entries SET source_text=$1, target_text=$2, topic=$3
               WHERE user_id=$4 AND id=$5
               RETURNING id,source_text,target_text,topic,created_at,mastered"#,
        )
        .bind(&valid.source_text)
        .bind(&valid.target_text)
        .bind(&valid.topic)
        .bind(user.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("pg update entry"))?;
        let entry = row_into_entry(row.ok_or(CoreError::NotFound("entry"))?);
        debug!(%user, %id, "entry updated");
        self.publish(user).await;
        Ok(entry)
    }

    async fn delete(&self, user: &UserId, id: EntryId) -> Result<(), CoreError> {
        let _feed = self.feed_lock.lock().await;
        let res = sqlx::query("DELETE FROM vocab_entries WHERE user_id=$1 AND id=$2")
            .bind(user.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("pg delete entry"))?;
        if res.rows_affected() == 0 {
            return Err(CoreError::NotFound("entry"));
        }
        debug!(%user, %id, "entry deleted");
        self.publish(user).await;
        Ok(())
    }
}

fn row_into_entry(row: PgRow) -> VocabEntry {
    VocabEntry {
        id: row.get::<uuid::Uuid, _>("id"),
        source_text: row.get::<String, _>("source_text"),
        target_text: row.get::<String, _>("target_text"),
        topic: row.get::<String, _>("topic"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        mastered: row.get::<bool, _>("mastered"),
    }
}
