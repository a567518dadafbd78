use flashlingo_core::{
    compute_topics, filter_by_text, filter_by_topic, sort_newest_first, topic_counts, EntryDraft,
    ReviewDeck, TopicFilter, VocabEntry, UNCLASSIFIED_TOPIC,
};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

fn entry(src: &str, dst: &str, topic: Option<&str>) -> VocabEntry {
    VocabEntry::new(EntryDraft::new(src, dst, topic).validate().unwrap())
}

#[test]
fn topics_are_sorted_distinct_and_cover_every_entry() {
    let mut raw = entry("cat", "mèo", None);
    // Snapshots from storage may carry an un-normalized topic.
    raw.topic = "  ".into();
    let v = vec![
        entry("apple", "táo", Some("Fruits")),
        entry("dog", "chó", Some("Animals")),
        entry("pear", "lê", Some("Fruits")),
        raw,
    ];

    let topics: Vec<String> = compute_topics(&v).into_iter().collect();
    assert_eq!(topics, vec!["Animals", "Fruits", UNCLASSIFIED_TOPIC]);
    assert!(topics.windows(2).all(|w| w[0] < w[1]));
    for e in &v {
        assert!(topics.contains(&e.normalized_topic()));
    }

    let counts = topic_counts(&v);
    assert_eq!(counts["Fruits"], 2);
    assert_eq!(counts["Animals"], 1);
    assert_eq!(counts[UNCLASSIFIED_TOPIC], 1);
}

#[test]
fn topics_of_empty_list_is_empty() {
    assert!(compute_topics(&[]).is_empty());
}

#[test]
fn filters_by_topic_and_text() {
    let v = vec![
        entry("apple", "táo", Some("Fruits")),
        entry("dog", "chó", Some("Animals")),
        entry("pineapple", "dứa", Some("Fruits")),
    ];
    assert_eq!(filter_by_topic(&v, &TopicFilter::All).len(), 3);
    assert_eq!(filter_by_topic(&v, &TopicFilter::Named("Fruits".into())).len(), 2);
    assert!(filter_by_topic(&v, &TopicFilter::Named("Jobs".into())).is_empty());

    let hits = filter_by_text(&v, "APPLE");
    assert_eq!(hits.len(), 2);
    assert_eq!(filter_by_text(&v, "chó")[0].source_text, "dog");
    assert_eq!(filter_by_text(&v, "animals").len(), 1);
    assert_eq!(filter_by_text(&v, "  ").len(), 3);
}

#[test]
fn newest_first_ordering() {
    let now = Utc::now();
    let mut a = entry("a", "1", None);
    let mut b = entry("b", "2", None);
    let mut c = entry("c", "3", None);
    a.created_at = now - Duration::seconds(10);
    b.created_at = now;
    c.created_at = now - Duration::seconds(5);
    let mut v = vec![a, b, c];
    sort_newest_first(&mut v);
    let order: Vec<&str> = v.iter().map(|e| e.source_text.as_str()).collect();
    assert_eq!(order, vec!["b", "c", "a"]);
}

#[test]
fn deck_next_prev_round_trip() {
    for len in 1..=5 {
        let v: Vec<VocabEntry> = (0..len)
            .map(|i| entry(&format!("w{i}"), &format!("t{i}"), None))
            .collect();
        let mut d = ReviewDeck::new(&v, TopicFilter::All);
        for start in 0..len {
            while d.cursor() != start {
                d.next().unwrap();
            }
            d.next().unwrap();
            d.prev().unwrap();
            assert_eq!(d.cursor(), start);
            d.prev().unwrap();
            d.next().unwrap();
            assert_eq!(d.cursor(), start);
        }
    }
}

#[test]
fn single_card_navigation_keeps_cursor_but_unflips() {
    let v = vec![entry("apple", "táo", None)];
    let mut d = ReviewDeck::new(&v, TopicFilter::All);

    d.toggle_flip().unwrap();
    assert!(d.is_flipped());
    d.next().unwrap();
    assert_eq!(d.cursor(), 0);
    assert!(!d.is_flipped());

    d.toggle_flip().unwrap();
    d.prev().unwrap();
    assert_eq!(d.cursor(), 0);
    assert!(!d.is_flipped());
}

#[test]
fn deck_for_missing_topic_is_empty() {
    let v = vec![entry("apple", "táo", Some("Fruits"))];
    let d = ReviewDeck::new(&v, TopicFilter::Named("Animals".into()));
    assert!(d.is_empty());
    assert_eq!(d.position(), None);
}
