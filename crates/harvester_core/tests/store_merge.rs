use std::sync::Once;

use harvester_core::{CommentId, CommentPayload, CommentRecord, CommentStore};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(harvester_logging::initialize_for_tests);
}

fn payload(author: &str, text: &str) -> CommentPayload {
    CommentPayload {
        author: author.to_string(),
        text: text.to_string(),
        timestamp: 1_700_000_000,
        likes: 0,
    }
}

#[test]
fn repeated_child_is_stored_once_for_every_replay_order() {
    init_logging();
    let parent = CommentId(10);
    let orders: [&[u64]; 4] = [
        &[1, 2, 3, 1, 2, 3],
        &[3, 3, 2, 1, 1],
        &[2, 1, 2, 3, 1, 3, 2],
        &[1, 1, 1, 2, 3],
    ];

    for order in orders {
        let mut store = CommentStore::new();
        store.upsert(CommentRecord::root(10, payload("root", "hello")));
        for &child in order {
            store.append_child(parent, CommentId(child));
        }
        let children = store.children(parent);
        assert_eq!(children.len(), 3, "order {order:?}");
        let mut sorted = children.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 3, "order {order:?}");
    }
}

#[test]
fn child_order_is_discovery_order() {
    init_logging();
    let mut store = CommentStore::new();
    let parent = CommentId(1);
    for child in [5, 3, 5, 9, 3, 7] {
        store.append_child(parent, CommentId(child));
    }
    assert_eq!(
        store.children(parent),
        &[CommentId(5), CommentId(3), CommentId(9), CommentId(7)]
    );
}

#[test]
fn upsert_overwrites_without_duplicating() {
    init_logging();
    let mut store = CommentStore::new();
    assert!(store.upsert(CommentRecord::root(1, payload("a", "first"))));
    assert!(!store.upsert(CommentRecord::root(1, payload("a", "edited"))));

    assert_eq!(store.size(), 1);
    assert_eq!(store.total_records(), 1);
    assert_eq!(store.root_ids(), &[CommentId(1)]);
    assert_eq!(store.get(CommentId(1)).unwrap().payload.text, "edited");
}

#[test]
fn children_loaded_survives_overwrite() {
    init_logging();
    let mut store = CommentStore::new();
    store.upsert(CommentRecord::root(1, payload("a", "first")));
    assert!(store.mark_children_loaded(CommentId(1)));

    store.upsert(CommentRecord::root(1, payload("a", "refreshed")));

    assert!(store.children_loaded(CommentId(1)));
    assert_eq!(store.get(CommentId(1)).unwrap().payload.text, "refreshed");
}

#[test]
fn marking_unknown_record_is_rejected() {
    init_logging();
    let mut store = CommentStore::new();
    assert!(!store.mark_children_loaded(CommentId(404)));
    assert!(!store.children_loaded(CommentId(404)));
}

#[test]
fn roots_keep_discovery_order() {
    init_logging();
    let mut store = CommentStore::new();
    for id in [30, 10, 20, 10] {
        store.upsert(CommentRecord::root(id, payload("a", "x")));
    }
    store.upsert(CommentRecord::reply(40, CommentId(30), payload("b", "y")));

    assert_eq!(
        store.root_ids(),
        &[CommentId(30), CommentId(10), CommentId(20)]
    );
    assert_eq!(store.size(), 3);
    assert_eq!(store.total_records(), 4);
}

#[test]
fn clear_empties_everything() {
    init_logging();
    let mut store = CommentStore::new();
    store.upsert(CommentRecord::root(1, payload("a", "x")));
    store.append_child(CommentId(1), CommentId(2));
    store.clear();

    assert_eq!(store.size(), 0);
    assert_eq!(store.total_records(), 0);
    assert!(store.children(CommentId(1)).is_empty());
}
