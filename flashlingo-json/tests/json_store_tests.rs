use flashlingo_core::{CoreError, EntryDraft, UserId, VocabRepository};
use flashlingo_json::{paths::store_files_in, JsonStore};
use std::time::Duration;
use tokio::time::timeout;

fn alice() -> UserId {
    UserId::new("alice").unwrap()
}

#[tokio::test]
async fn entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let (file, backups) = store_files_in(dir.path());

    let created = {
        let store = JsonStore::open_with(file.clone(), backups.clone(), 3).await.unwrap();
        let a = store
            .create(&alice(), &EntryDraft::new("apple", "táo", Some("Fruits")))
            .await
            .unwrap();
        store
            .create(&alice(), &EntryDraft::new("dog", "chó", None))
            .await
            .unwrap();
        a
    };

    let store = JsonStore::open_with(file, backups, 3).await.unwrap();
    let v = store.list(&alice()).await.unwrap();
    assert_eq!(v.len(), 2);
    assert_eq!(v[1].id, created.id);
    assert_eq!(store.get(&alice(), created.id).await.unwrap().topic, "Fruits");
}

#[tokio::test]
async fn backups_are_rotated() {
    let dir = tempfile::tempdir().unwrap();
    let (file, backups) = store_files_in(dir.path());
    let store = JsonStore::open_with(file, backups.clone(), 2).await.unwrap();
    for i in 0..5 {
        store
            .create(&alice(), &EntryDraft::new(format!("w{i}"), "x", None))
            .await
            .unwrap();
    }
    let count = std::fs::read_dir(&backups)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("json"))
        .count();
    assert!(count <= 2, "kept {count} backups");
}

#[tokio::test]
async fn update_and_delete_report_missing_entries() {
    let dir = tempfile::tempdir().unwrap();
    let (file, backups) = store_files_in(dir.path());
    let store = JsonStore::open_with(file, backups, 3).await.unwrap();
    let e = store
        .create(&alice(), &EntryDraft::new("a", "b", None))
        .await
        .unwrap();
    let bob = UserId::new("bob").unwrap();

    assert_eq!(
        store.update(&bob, e.id, &EntryDraft::new("x", "y", None)).await,
        Err(CoreError::NotFound("entry"))
    );
    assert_eq!(
        store.create(&alice(), &EntryDraft::new("a", " ", None)).await,
        Err(CoreError::Validation("target_text"))
    );
    store.delete(&alice(), e.id).await.unwrap();
    assert_eq!(store.delete(&alice(), e.id).await, Err(CoreError::NotFound("entry")));
}

#[tokio::test]
async fn writes_reach_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let (file, backups) = store_files_in(dir.path());
    let store = JsonStore::open_with(file, backups, 3).await.unwrap();

    let mut sub = store.subscribe(&alice()).await.unwrap();
    assert!(sub.latest().is_empty());
    store
        .create(&alice(), &EntryDraft::new("apple", "táo", None))
        .await
        .unwrap();
    let snap = timeout(Duration::from_secs(1), sub.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].source_text, "apple");
}

#[tokio::test]
async fn failed_save_leaves_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let (file, backups) = store_files_in(dir.path());
    let store = JsonStore::open_with(file.clone(), backups.clone(), 3).await.unwrap();
    let kept = store
        .create(&alice(), &EntryDraft::new("dog", "chó", None))
        .await
        .unwrap();
    let mut sub = store.subscribe(&alice()).await.unwrap();

    // A regular file where the backups directory should be makes every save fail.
    std::fs::remove_dir_all(&backups).unwrap();
    std::fs::write(&backups, b"not a directory").unwrap();

    let err = store
        .create(&alice(), &EntryDraft::new("apple", "táo", None))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Storage("io"));
    let err = store
        .update(&alice(), kept.id, &EntryDraft::new("cat", "mèo", None))
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::Storage("io"));
    assert_eq!(
        store.delete(&alice(), kept.id).await.unwrap_err(),
        CoreError::Storage("io")
    );

    let v = store.list(&alice()).await.unwrap();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].source_text, "dog");
    assert!(sub.try_changed().is_none());
    assert!(!std::fs::read_to_string(&file).unwrap().contains("apple"));

    // Once saving works again the store picks up where it was.
    std::fs::remove_file(&backups).unwrap();
    store
        .create(&alice(), &EntryDraft::new("cat", "mèo", None))
        .await
        .unwrap();
    drop(store);
    let reopened = JsonStore::open_with(file, backups, 3).await.unwrap();
    let names: Vec<_> = reopened
        .list(&alice())
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.source_text)
        .collect();
    assert_eq!(names, vec!["cat".to_string(), "dog".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_keep_disk_and_feed_current() {
    let dir = tempfile::tempdir().unwrap();
    let (file, backups) = store_files_in(dir.path());
    let store = std::sync::Arc::new(
        JsonStore::open_with(file.clone(), backups.clone(), 3).await.unwrap(),
    );
    let sub = store.subscribe(&alice()).await.unwrap();

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create(&alice(), &EntryDraft::new(format!("w{i}"), "x", None))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for t in tasks {
        t.await.unwrap();
    }

    let listed = store.list(&alice()).await.unwrap();
    assert_eq!(listed.len(), 12);
    assert_eq!(*sub.latest(), listed);
    drop(store);
    let reopened = JsonStore::open_with(file, backups, 3).await.unwrap();
    assert_eq!(reopened.list(&alice()).await.unwrap().len(), 12);
}
