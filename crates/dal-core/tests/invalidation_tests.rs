//! Invalidation Tests
//!
//! Store events reaching open sessions, including events racing a rebuild.

use dal_core::prelude::*;
use dal_core::ConfigurationChange;
use dal_test_utils::{scenario_builder, scenario_store, SCENARIO_JSON};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[test]
fn update_invalidates_cache_and_overrides() {
    let store = scenario_store();
    let session = Session::open(store.clone(), "R").unwrap();
    let o = session.find("O").unwrap();
    let b = session.find("B").unwrap();

    session.set_disabled(&[b]);
    assert!(session.is_disabled(o).unwrap());

    store.update("O", Relationship::Contains, &["B"]).unwrap();
    assert_eq!(session.override_count(), 0);
    assert!(session.stats().is_none());
    // O now only holds B, which is enabled again
    assert!(session.is_enabled(o).unwrap());
}

#[test]
fn notification_clears_overrides() {
    let store = scenario_store();
    let session = Session::open(store.clone(), "R").unwrap();
    let a = session.find("A").unwrap();

    session.set_enabled(&[a]);
    assert!(session.is_enabled(a).unwrap());

    let mut change = ConfigurationChange::new("Application");
    change.modified.push("A".into());
    store.notify(&[change]);

    assert!(session.is_disabled(a).unwrap());
    assert_eq!(session.rebuild_count(), 2);
}

#[test]
fn reload_is_seen_by_open_sessions() {
    let store = scenario_store();
    let session = Session::open(store.clone(), "R").unwrap();
    assert!(session.is_disabled(session.find("O").unwrap()).unwrap());

    store.update("R", Relationship::Disabled, &[]).unwrap();
    assert!(session.is_enabled(session.find("O").unwrap()).unwrap());

    store.load_json(SCENARIO_JSON).unwrap();
    assert!(session.is_disabled(session.find("O").unwrap()).unwrap());

    store.unload();
    assert!(session.root().is_err());
    assert!(matches!(
        session.resolution(),
        Err(DalError::SessionNotFound(ref uid)) if uid == "R"
    ));
}

#[test]
fn every_session_is_invalidated() {
    let mut b = scenario_builder();
    b.session("R2", &["S"], &[], &[]);
    let store = Arc::new(ConfigStore::from_graph(b.build().unwrap()));
    let first = Session::open(store.clone(), "R").unwrap();
    let second = Session::open(store.clone(), "R2").unwrap();
    let a = first.find("A").unwrap();

    assert!(first.is_disabled(a).unwrap());
    assert!(second.is_enabled(a).unwrap());

    store.notify(&[]);
    assert!(first.stats().is_none());
    assert!(second.stats().is_none());
    assert_eq!(store.action_count(), 2);
}

#[test]
fn notifications_racing_queries_never_leave_stale_cache() {
    let store = scenario_store();
    let session = Session::open(store.clone(), "R").unwrap();
    let o = session.find("O").unwrap();
    let b = session.find("B").unwrap();
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..200 {
                store.notify(&[]);
                std::thread::yield_now();
            }
            done.store(true, Ordering::SeqCst);
        });
        for _ in 0..4 {
            s.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    // O is disabled in every snapshot of this store
                    assert!(session.is_disabled(o).unwrap());
                    assert!(session.is_enabled(b).unwrap());
                }
            });
        }
    });

    // switch the graph, then make sure the committed cache follows it
    store.update("O", Relationship::Contains, &["B"]).unwrap();
    assert!(session.is_enabled(o).unwrap());
    let rebuilds = session.rebuild_count();
    assert!(session.is_enabled(o).unwrap());
    assert_eq!(session.rebuild_count(), rebuilds);
}
