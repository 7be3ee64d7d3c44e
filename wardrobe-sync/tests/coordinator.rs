//! Reconcile, cache-first load and optimistic mutation behaviour of
//! `SyncCoordinator` against in-memory collaborators.

mod common;

use std::cell::{Cell, RefCell};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;

use wardrobe_core::{AttributeValue, Attributes, ImageRef, ItemDraft, ItemId, LocalReplicaStore};
use wardrobe_sync::{CreateError, ReconcileStatus, SyncCoordinator, SyncPhase};

use common::{ids, record, FakeClassifier, FakeRemote, Harness};

fn five() -> Vec<wardrobe_core::ItemRecord> {
    vec![
        record("A", 5, true),
        record("B", 4, true),
        record("C", 3, false),
        record("D", 2, true),
        record("E", 1, false),
    ]
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_reconcile_replaces_local_set_exactly() {
    let h = Harness::new(
        vec![record("stale", 9, true), record("B", 2, true)],
        FakeRemote::with_rows(vec![
            record("B", 2, false),
            record("Z", 3, true),
            record("Y", 1, true),
        ]),
    );
    let coordinator = h.coordinator();

    let outcome = coordinator.reconcile().await;

    assert_eq!(outcome.status, ReconcileStatus::Synced);
    assert!(outcome.success());
    assert_eq!(ids(&outcome.items), vec!["Z", "B", "Y"]);
    let local = h.replica.get_all().unwrap();
    assert_eq!(local, outcome.items);
    assert!(!local[1].is_clean, "remote value wins for B");
    assert!(h.replica.last_sync().unwrap().is_some());
}

#[tokio::test]
async fn failed_reconcile_leaves_replica_bytes_unchanged() {
    let h = Harness::new(five(), FakeRemote::with_rows(vec![record("X", 1, true)]));
    h.remote.fail_list.store(true, Ordering::SeqCst);
    let before = std::fs::read(h.replica.path()).unwrap();

    let outcome = h.coordinator().reconcile().await;

    assert_eq!(outcome.status, ReconcileStatus::Failed);
    assert!(!outcome.success());
    assert_eq!(ids(&outcome.items), vec!["A", "B", "C", "D", "E"]);
    assert_eq!(std::fs::read(h.replica.path()).unwrap(), before);
}

#[tokio::test]
async fn last_outcome_outlives_the_coordinator() {
    let h = Harness::new(five(), FakeRemote::with_rows(five()));
    h.remote.fail_list.store(true, Ordering::SeqCst);
    assert_eq!(h.coordinator().reconcile().await.status, ReconcileStatus::Failed);

    // A fresh coordinator over the same replica, as a new process would build.
    let status = h.coordinator().sync_status().await;
    assert_eq!(status.phase, SyncPhase::Idle);
    assert_eq!(status.last_outcome, Some(ReconcileStatus::Failed));
    assert!(status.last_attempt_at.is_some());
    assert_eq!(status.cached_items, 5);

    h.remote.fail_list.store(false, Ordering::SeqCst);
    assert!(h.coordinator().reconcile().await.success());
    let status = h.coordinator().sync_status().await;
    assert_eq!(status.last_outcome, Some(ReconcileStatus::Synced));
}

#[tokio::test]
async fn skipped_requests_do_not_overwrite_recorded_outcome() {
    let h = Harness::new(five(), FakeRemote::with_rows(five()));
    let coordinator = h.coordinator_with_interval(Duration::from_secs(60));
    assert!(coordinator.reconcile().await.success());
    assert_eq!(
        coordinator.reconcile().await.status,
        ReconcileStatus::RateLimited
    );

    let status = h.coordinator().sync_status().await;
    assert_eq!(status.last_outcome, Some(ReconcileStatus::Synced));
}

#[tokio::test(start_paused = true)]
async fn reconcile_within_interval_is_rate_limited() {
    let h = Harness::new(vec![record("L", 1, true)], FakeRemote::with_rows(five()));
    let coordinator = h.coordinator_with_interval(wardrobe_sync::MIN_SYNC_INTERVAL);

    assert!(coordinator.reconcile().await.success());
    assert_eq!(h.remote.lists(), 1);

    tokio::time::advance(Duration::from_secs(4)).await;
    let second = coordinator.reconcile().await;
    assert_eq!(second.status, ReconcileStatus::RateLimited);
    assert_eq!(h.remote.lists(), 1, "second attempt never reaches the remote");
    assert_eq!(second.items.len(), 5, "answered with the local snapshot");

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(coordinator.reconcile().await.success());
    assert_eq!(h.remote.lists(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_attempt_still_consumes_the_window() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(five()));
    h.remote.fail_list.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator_with_interval(Duration::from_secs(5));

    assert_eq!(coordinator.reconcile().await.status, ReconcileStatus::Failed);
    h.remote.fail_list.store(false, Ordering::SeqCst);

    tokio::time::advance(Duration::from_millis(4_999)).await;
    assert_eq!(
        coordinator.reconcile().await.status,
        ReconcileStatus::RateLimited
    );
    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(coordinator.reconcile().await.status, ReconcileStatus::Synced);
}

#[tokio::test]
async fn request_during_reconcile_gets_local_snapshot() {
    let h = Harness::new(vec![record("L", 1, true)], FakeRemote::with_rows(five()));
    h.remote.hold_list();
    let coordinator = h.coordinator();

    let (first, second) = tokio::join!(coordinator.reconcile(), async {
        assert_eq!(coordinator.phase(), SyncPhase::Syncing);
        let second = coordinator.reconcile().await;
        h.remote.open_list();
        second
    });

    assert_eq!(second.status, ReconcileStatus::InFlight);
    assert_eq!(ids(&second.items), vec!["L"]);
    assert_eq!(first.status, ReconcileStatus::Synced);
    assert_eq!(h.remote.lists(), 1);
    assert_eq!(coordinator.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn separate_coordinators_do_not_share_rate_limit() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(five()));
    let a = h.coordinator_with_interval(Duration::from_secs(60));
    let b = h.coordinator_with_interval(Duration::from_secs(60));

    assert!(a.reconcile().await.success());
    assert!(b.reconcile().await.success());
    assert!(!a.reconcile().await.success());
}

// ---------------------------------------------------------------------------
// Cache-first load
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_with_empty_replica_emits_remote_once() {
    let h = Harness::new(
        Vec::new(),
        FakeRemote::with_rows(vec![
            record("a", 1, true),
            record("b", 2, true),
            record("c", 3, true),
        ]),
    );
    assert_eq!(h.replica.last_sync().unwrap(), None);

    let local_calls = Cell::new(0);
    let remote_calls = RefCell::new(Vec::new());
    let outcome = h
        .coordinator()
        .load(
            |_| local_calls.set(local_calls.get() + 1),
            |items| remote_calls.borrow_mut().push(items.len()),
        )
        .await;

    assert!(outcome.success());
    assert_eq!(local_calls.get(), 0);
    assert_eq!(*remote_calls.borrow(), vec![3]);
    assert!(h.replica.last_sync().unwrap().is_some());
}

#[tokio::test]
async fn load_emits_cache_then_fresh_set() {
    let h = Harness::new(
        vec![record("old", 1, true)],
        FakeRemote::with_rows(vec![record("new", 2, true)]),
    );

    let seen = RefCell::new(Vec::new());
    h.coordinator()
        .load(
            |items| seen.borrow_mut().push(("local", ids(&items))),
            |items| seen.borrow_mut().push(("remote", ids(&items))),
        )
        .await;

    assert_eq!(
        *seen.borrow(),
        vec![
            ("local", vec!["old".to_string()]),
            ("remote", vec!["new".to_string()]),
        ]
    );
}

#[tokio::test]
async fn load_keeps_cache_when_remote_fails() {
    let h = Harness::new(five(), FakeRemote::with_rows(Vec::new()));
    h.remote.fail_list.store(true, Ordering::SeqCst);

    let local_calls = Cell::new(0);
    let remote_calls = Cell::new(0);
    let outcome = h
        .coordinator()
        .load(
            |_| local_calls.set(local_calls.get() + 1),
            |_| remote_calls.set(remote_calls.get() + 1),
        )
        .await;

    assert!(!outcome.success());
    assert_eq!(local_calls.get(), 1);
    assert_eq!(remote_calls.get(), 0);
    assert_eq!(h.local_ids(), vec!["A", "B", "C", "D", "E"]);
}

#[tokio::test]
async fn load_with_empty_replica_reports_failure_through_second_callback() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(five()));
    h.remote.fail_list.store(true, Ordering::SeqCst);

    let remote_items = RefCell::new(None);
    let outcome = h
        .coordinator()
        .load(|_| panic!("nothing cached"), |items| {
            *remote_items.borrow_mut() = Some(items)
        })
        .await;

    assert_eq!(outcome.status, ReconcileStatus::Failed);
    assert_eq!(remote_items.borrow().as_ref().map(Vec::len), Some(0));
}

// ---------------------------------------------------------------------------
// Optimistic mutations
// ---------------------------------------------------------------------------

#[rstest]
#[case(1, false)]
#[case(2, true)]
#[case(3, false)]
#[case(4, true)]
#[tokio::test]
async fn toggle_parity(#[case] toggles: usize, #[case] expected: bool) {
    let h = Harness::new(
        vec![record("shirt", 1, true)],
        FakeRemote::with_rows(vec![record("shirt", 1, true)]),
    );
    let coordinator = h.coordinator();
    let id = ItemId::from("shirt");

    for _ in 0..toggles {
        let push = coordinator.toggle_cleanliness(&id).await.expect("cached item");
        push.await.unwrap();
    }

    assert_eq!(h.replica.get(&id).unwrap().unwrap().is_clean, expected);
    assert_eq!(h.remote.row("shirt").unwrap().is_clean, expected);
    assert_eq!(h.remote.updates.lock().unwrap().len(), toggles);
}

#[tokio::test]
async fn toggles_are_visible_locally_before_pushes_settle() {
    let h = Harness::new(
        vec![record("a", 1, true), record("b", 2, false)],
        FakeRemote::gated(vec![record("a", 1, true), record("b", 2, false)]),
    );
    let coordinator = h.coordinator();

    let push_a = coordinator.toggle_cleanliness(&ItemId::from("a")).await.unwrap();
    let push_b = coordinator.toggle_cleanliness(&ItemId::from("b")).await.unwrap();

    assert!(!h.replica.get(&ItemId::from("a")).unwrap().unwrap().is_clean);
    assert!(h.replica.get(&ItemId::from("b")).unwrap().unwrap().is_clean);
    assert!(h.remote.updates.lock().unwrap().is_empty());

    h.remote.open_pushes();
    push_a.await.unwrap();
    push_b.await.unwrap();
    assert_eq!(h.remote.updates.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn toggle_of_uncached_item_is_a_no_op() {
    let h = Harness::new(vec![record("a", 1, true)], FakeRemote::with_rows(Vec::new()));
    assert!(h
        .coordinator()
        .toggle_cleanliness(&ItemId::from("ghost"))
        .await
        .is_none());
    assert!(h.remote.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_toggle_push_is_reverted_by_next_reconcile() {
    let h = Harness::new(
        vec![record("a", 1, true)],
        FakeRemote::with_rows(vec![record("a", 1, true)]),
    );
    h.remote.fail_update.store(true, Ordering::SeqCst);
    let coordinator = h.coordinator();

    let push = coordinator.toggle_cleanliness(&ItemId::from("a")).await.unwrap();
    push.await.unwrap();
    assert!(!h.replica.get(&ItemId::from("a")).unwrap().unwrap().is_clean);

    coordinator.reconcile().await;
    assert!(h.replica.get(&ItemId::from("a")).unwrap().unwrap().is_clean);
}

#[tokio::test]
async fn edit_replaces_attributes_locally_and_remotely() {
    let h = Harness::new(
        vec![record("a", 1, true)],
        FakeRemote::with_rows(vec![record("a", 1, true)]),
    );
    let mut attributes = Attributes::new();
    attributes.insert("color".into(), AttributeValue::from("navy"));

    let push = h
        .coordinator()
        .update_attributes(&ItemId::from("a"), attributes.clone())
        .await
        .expect("cached item");

    assert_eq!(
        h.replica.get(&ItemId::from("a")).unwrap().unwrap().attributes,
        attributes
    );
    push.await.unwrap();
    let remote = h.remote.row("a").unwrap();
    assert_eq!(remote.attributes, attributes);
    assert!(remote.is_clean, "edit leaves cleanliness alone");
}

#[tokio::test]
async fn remove_is_local_first_and_reconcile_restores_failed_delete() {
    let h = Harness::new(five(), FakeRemote::gated(five()));
    h.remote.fail_delete_of("C");
    let coordinator = h.coordinator();

    let push = coordinator
        .delete_item(
            &ItemId::from("C"),
            Some(&ImageRef::from("https://cdn.test/wardrobe/C.jpg")),
        )
        .await;
    assert_eq!(h.local_ids(), vec!["A", "B", "D", "E"]);
    assert!(h.remote.deletes.lock().unwrap().is_empty());

    h.remote.open_pushes();
    push.await.unwrap();
    assert_eq!(*h.remote.deletes.lock().unwrap(), vec![ItemId::from("C")]);
    assert_eq!(*h.blobs.removed.lock().unwrap(), vec!["C.jpg".to_string()]);

    h.remote.fail_list.store(true, Ordering::SeqCst);
    assert!(!coordinator.reconcile().await.success());
    assert_eq!(h.local_ids(), vec!["A", "B", "D", "E"]);

    h.remote.fail_list.store(false, Ordering::SeqCst);
    assert!(coordinator.reconcile().await.success());
    assert_eq!(h.local_ids(), vec!["A", "B", "C", "D", "E"]);
}

#[tokio::test]
async fn delete_many_removes_locally_then_deletes_sequentially() {
    let h = Harness::new(five(), FakeRemote::gated(five()));
    h.remote.fail_delete_of("B");
    let coordinator = h.coordinator();

    let targets = ["A", "B", "D"]
        .iter()
        .map(|id| (ItemId::from(*id), None))
        .collect();
    let push = coordinator.delete_many(targets).await;
    assert_eq!(h.local_ids(), vec!["C", "E"]);

    h.remote.open_pushes();
    push.await.unwrap();
    assert_eq!(
        *h.remote.deletes.lock().unwrap(),
        vec![ItemId::from("A"), ItemId::from("B"), ItemId::from("D")]
    );
    assert_eq!(h.remote.row_ids(), vec!["B", "C", "E"]);

    coordinator.reconcile().await;
    assert_eq!(h.local_ids(), vec!["B", "C", "E"]);
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_with_failing_upload_leaves_replica_untouched() {
    let h = Harness::new(five(), FakeRemote::with_rows(five()));
    h.blobs.fail_upload.store(true, Ordering::SeqCst);

    let err = h
        .coordinator()
        .create_item(ItemDraft::default(), b"jpeg".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, CreateError::Upload(_)), "got: {err}");
    assert_eq!(h.replica.get_all().unwrap().len(), 5);
    assert!(h.remote.inserts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn create_merges_classifier_tags_and_mirrors_stored_record() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(Vec::new()));
    let classifier = Arc::new(FakeClassifier::returning(&[
        ("category", "Top"),
        ("color", "red"),
    ]));
    let coordinator = h.coordinator().with_classifier(classifier.clone());

    let mut draft = ItemDraft::default();
    draft
        .attributes
        .insert("color".into(), AttributeValue::from("maroon"));

    let stored = coordinator
        .create_item(draft, b"jpeg-bytes".to_vec())
        .await
        .expect("create");

    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(stored.id, ItemId::from("srv-1"));
    assert_eq!(stored.category(), Some("Top"));
    assert_eq!(stored.attributes["color"], AttributeValue::from("maroon"));

    let uploads = h.blobs.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].0.ends_with(".jpg"));
    assert_eq!(uploads[0].1, 10);
    assert_eq!(stored.image_ref.blob_name(), Some(uploads[0].0.as_str()));

    assert_eq!(h.replica.get(&stored.id).unwrap(), Some(stored.clone()));
}

#[tokio::test]
async fn create_with_failing_classifier_uploads_nothing() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(Vec::new()));
    let coordinator = h
        .coordinator()
        .with_classifier(Arc::new(FakeClassifier::failing()));

    let err = coordinator
        .create_item(ItemDraft::default(), b"x".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, CreateError::Classify(_)));
    assert!(h.blobs.uploads.lock().unwrap().is_empty());
    assert!(!h.replica.has_data().unwrap());
}

#[tokio::test]
async fn create_with_failing_insert_cleans_up_photo() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(Vec::new()));
    h.remote.fail_insert.store(true, Ordering::SeqCst);

    let err = h
        .coordinator()
        .create_item(ItemDraft::default(), b"x".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, CreateError::Insert(_)));
    let uploaded = h.blobs.uploads.lock().unwrap()[0].0.clone();
    assert_eq!(*h.blobs.removed.lock().unwrap(), vec![uploaded]);
    assert!(!h.replica.has_data().unwrap());
}

// ---------------------------------------------------------------------------
// Degraded local storage
// ---------------------------------------------------------------------------

fn unusable_replica(h: &Harness) -> SyncCoordinator {
    // A directory where the document should be: every read and write fails.
    let path = h.home.path().join("blocked").join("replica.json");
    std::fs::create_dir_all(&path).unwrap();
    let replica = Arc::new(LocalReplicaStore::with_path(path));
    SyncCoordinator::new(replica, h.remote.clone(), h.blobs.clone())
        .with_min_interval(Duration::ZERO)
}

#[tokio::test]
async fn unavailable_replica_falls_back_to_remote_reads() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(five()));
    let coordinator = unusable_replica(&h);

    let remote_items = RefCell::new(Vec::new());
    let outcome = coordinator
        .load(|_| panic!("nothing readable locally"), |items| {
            *remote_items.borrow_mut() = items
        })
        .await;

    assert!(outcome.success());
    assert_eq!(remote_items.borrow().len(), 5);

    let status = coordinator.sync_status().await;
    assert!(!status.local_available);
    assert_eq!(status.last_outcome, Some(ReconcileStatus::Synced));
}

#[tokio::test]
async fn unavailable_replica_still_pushes_edits() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(five()));
    let coordinator = unusable_replica(&h);

    assert!(coordinator.toggle_cleanliness(&ItemId::from("A")).await.is_none());

    let push = coordinator
        .update_attributes(&ItemId::from("A"), Attributes::new())
        .await
        .expect("remote-only edit");
    push.await.unwrap();
    assert_eq!(h.remote.updates.lock().unwrap().len(), 1);

    coordinator.delete_item(&ItemId::from("E"), None).await.await.unwrap();
    assert!(h.remote.row("E").is_none());
    assert!(!coordinator.clear_local().await);
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reports_cache_and_last_outcome() {
    let h = Harness::new(Vec::new(), FakeRemote::with_rows(five()));
    let coordinator = h.coordinator();

    let before = coordinator.sync_status().await;
    assert_eq!(before.phase, SyncPhase::Idle);
    assert_eq!(before.last_outcome, None);
    assert_eq!(before.cached_items, 0);
    assert!(before.local_available);

    coordinator.reconcile().await;
    let after = coordinator.sync_status().await;
    assert_eq!(after.cached_items, 5);
    assert_eq!(after.last_outcome, Some(ReconcileStatus::Synced));
    assert!(after.last_sync_at.is_some());

    assert!(coordinator.clear_local().await);
    let cleared = coordinator.sync_status().await;
    assert_eq!(cleared.cached_items, 0);
    assert_eq!(cleared.last_sync_at, None);
}
