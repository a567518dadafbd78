use flashlingo_core::{
    memory::MemoryRepo, CoreError, EntryDraft, UserId, VocabRepository, UNCLASSIFIED_TOPIC,
};
use std::time::Duration;
use tokio::time::timeout;

fn user(name: &str) -> UserId {
    UserId::new(name).unwrap()
}

#[tokio::test]
async fn crud_round() {
    let repo = MemoryRepo::new();
    let u = user("alice");

    let e = repo
        .create(&u, &EntryDraft::new(" apple ", " táo", None))
        .await
        .unwrap();
    assert_eq!(e.source_text, "apple");
    assert_eq!(e.target_text, "táo");
    assert_eq!(e.topic, UNCLASSIFIED_TOPIC);
    assert!(!e.mastered);

    let e2 = repo
        .update(&u, e.id, &EntryDraft::new("apple", "quả táo", Some("Fruits")))
        .await
        .unwrap();
    assert_eq!(e2.id, e.id);
    assert_eq!(e2.created_at, e.created_at);
    assert_eq!(e2.topic, "Fruits");
    assert_eq!(repo.get(&u, e.id).await.unwrap().target_text, "quả táo");

    repo.delete(&u, e.id).await.unwrap();
    assert_eq!(repo.get(&u, e.id).await, Err(CoreError::NotFound("entry")));
    assert_eq!(repo.delete(&u, e.id).await, Err(CoreError::NotFound("entry")));
}

#[tokio::test]
async fn invalid_drafts_are_rejected() {
    let repo = MemoryRepo::new();
    let u = user("alice");
    assert_eq!(
        repo.create(&u, &EntryDraft::new("  ", "x", None)).await,
        Err(CoreError::Validation("source_text"))
    );
    let e = repo.create(&u, &EntryDraft::new("a", "b", None)).await.unwrap();
    assert_eq!(
        repo.update(&u, e.id, &EntryDraft::new("a", "", None)).await,
        Err(CoreError::Validation("target_text"))
    );
    assert!(repo.list(&u).await.unwrap().iter().all(|x| x.target_text == "b"));
}

#[tokio::test]
async fn users_are_isolated() {
    let repo = MemoryRepo::new();
    let (a, b) = (user("alice"), user("bob"));
    let e = repo.create(&a, &EntryDraft::new("a", "b", None)).await.unwrap();

    assert!(repo.list(&b).await.unwrap().is_empty());
    assert_eq!(repo.get(&b, e.id).await, Err(CoreError::NotFound("entry")));
    assert_eq!(
        repo.update(&b, e.id, &EntryDraft::new("x", "y", None)).await,
        Err(CoreError::NotFound("entry"))
    );
    assert_eq!(repo.delete(&b, e.id).await, Err(CoreError::NotFound("entry")));
}

#[tokio::test]
async fn subscription_delivers_full_snapshots() {
    let repo = MemoryRepo::new();
    let u = user("alice");
    repo.create(&u, &EntryDraft::new("first", "1", None)).await.unwrap();

    let mut sub = repo.subscribe(&u).await.unwrap();
    assert_eq!(sub.latest().len(), 1);

    let second = repo.create(&u, &EntryDraft::new("second", "2", None)).await.unwrap();
    let snap = timeout(Duration::from_secs(1), sub.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snap.len(), 2);
    assert_eq!(snap[0].id, second.id);

    repo.delete(&u, second.id).await.unwrap();
    let snap = timeout(Duration::from_secs(1), sub.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].source_text, "first");

    // A fresh subscription starts from the current collection.
    let again = repo.subscribe(&u).await.unwrap();
    assert_eq!(again.latest().len(), 1);
}

#[tokio::test]
async fn other_users_writes_do_not_wake_subscribers() {
    let repo = MemoryRepo::new();
    let (a, b) = (user("alice"), user("bob"));
    let mut sub = repo.subscribe(&a).await.unwrap();
    assert!(sub.latest().is_empty());

    repo.create(&b, &EntryDraft::new("x", "y", None)).await.unwrap();
    assert!(timeout(Duration::from_millis(50), sub.changed()).await.is_err());
}

#[tokio::test]
async fn subscription_ends_when_repo_dropped() {
    let repo = MemoryRepo::new();
    let u = user("alice");
    let mut sub = repo.subscribe(&u).await.unwrap();
    drop(repo);
    assert!(sub.changed().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_leave_latest_snapshot_current() {
    let repo = std::sync::Arc::new(MemoryRepo::new());
    let u = user("alice");
    let sub = repo.subscribe(&u).await.unwrap();

    for round in 0..100 {
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let repo = repo.clone();
                let u = u.clone();
                tokio::spawn(async move {
                    repo.create(&u, &EntryDraft::new(format!("w{round}-{i}"), "x", None))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }
        let listed = repo.list(&u).await.unwrap();
        assert_eq!(sub.latest().len(), listed.len(), "round {round}");
        assert_eq!(*sub.latest(), listed);
    }
}
