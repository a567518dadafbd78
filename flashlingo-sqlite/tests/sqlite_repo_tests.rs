use flashlingo_core::{CoreError, EntryDraft, UserId, VocabRepository, UNCLASSIFIED_TOPIC};
use flashlingo_sqlite::SqliteRepo;
use std::time::Duration;
use tokio::time::timeout;

fn user(name: &str) -> UserId {
    UserId::new(name).unwrap()
}

#[tokio::test]
async fn crud_and_ordering() {
    let repo = SqliteRepo::open_memory().await.unwrap();
    let u = user("alice");

    let first = repo
        .create(&u, &EntryDraft::new("apple", "táo", Some("")))
        .await
        .unwrap();
    assert_eq!(first.topic, UNCLASSIFIED_TOPIC);
    tokio::time::sleep(Duration::from_millis(2)).await;
    let second = repo
        .create(&u, &EntryDraft::new("dog", "chó", Some("Animals")))
        .await
        .unwrap();

    let v = repo.list(&u).await.unwrap();
    assert_eq!(v.iter().map(|e| e.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    assert_eq!(repo.get(&u, first.id).await.unwrap(), first);

    let edited = repo
        .update(&u, first.id, &EntryDraft::new("Apple", "quả táo", Some("Fruits")))
        .await
        .unwrap();
    assert_eq!(edited.created_at, first.created_at);
    assert_eq!(edited.topic, "Fruits");

    repo.delete(&u, second.id).await.unwrap();
    assert_eq!(repo.list(&u).await.unwrap().len(), 1);
    assert_eq!(repo.delete(&u, second.id).await, Err(CoreError::NotFound("entry")));
}

#[tokio::test]
async fn rows_are_scoped_per_user() {
    let repo = SqliteRepo::open_memory().await.unwrap();
    let e = repo
        .create(&user("alice"), &EntryDraft::new("a", "b", None))
        .await
        .unwrap();
    let bob = user("bob");
    assert!(repo.list(&bob).await.unwrap().is_empty());
    assert_eq!(repo.get(&bob, e.id).await, Err(CoreError::NotFound("entry")));
    assert_eq!(
        repo.update(&bob, e.id, &EntryDraft::new("x", "y", None)).await,
        Err(CoreError::NotFound("entry"))
    );
}

#[tokio::test]
async fn file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.sqlite3");
    let u = user("alice");
    {
        let repo = SqliteRepo::open_file(&path).await.unwrap();
        repo.create(&u, &EntryDraft::new("apple", "táo", None)).await.unwrap();
    }
    let repo = SqliteRepo::open_file(&path).await.unwrap();
    assert_eq!(repo.list(&u).await.unwrap()[0].source_text, "apple");
}

#[tokio::test]
async fn subscribers_see_writes() {
    let repo = SqliteRepo::open_memory().await.unwrap();
    let u = user("alice");
    let mut sub = repo.subscribe(&u).await.unwrap();
    repo.create(&u, &EntryDraft::new("apple", "táo", None)).await.unwrap();
    let snap = timeout(Duration::from_secs(1), sub.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snap.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_leave_latest_snapshot_current() {
    let repo = std::sync::Arc::new(SqliteRepo::open_memory().await.unwrap());
    let u = user("alice");
    let sub = repo.subscribe(&u).await.unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let repo = repo.clone();
            let u = u.clone();
            tokio::spawn(async move {
                repo.create(&u, &EntryDraft::new(format!("w{i}"), "x", None))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    let listed = repo.list(&u).await.unwrap();
    assert_eq!(listed.len(), 16);
    assert_eq!(*sub.latest(), listed);
}
