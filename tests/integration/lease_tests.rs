//! Liveness lease over the directory-backed store, where several handles
//! (standing in for several slave processes) share one directory.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::TimeDelta;
use solarctl::adapters::file_store::FileStore;
use solarctl::adapters::time::{ManualClock, SystemClock};
use solarctl::app::ports::ChannelStore;
use solarctl::config::LeaseAcquire;
use solarctl::error::Error;
use solarctl::link::LivenessLease;

#[test]
fn exactly_one_contender_wins_the_atomic_lease() {
    let dir = tempfile::tempdir().unwrap();
    let contenders = 8;
    let barrier = Arc::new(Barrier::new(contenders));

    let handles: Vec<_> = (0..contenders)
        .map(|_| {
            let path = dir.path().to_path_buf();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut store = FileStore::open(path, SystemClock).unwrap();
                let lease = LivenessLease::new("solar", 60, LeaseAcquire::Atomic);
                barrier.wait();
                lease.acquire(&mut store)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, Error::Ownership(_)))
    );
}

#[test]
fn released_lease_is_free_for_the_next_process() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::at_millis(1_000);
    let mut first = FileStore::open(dir.path(), clock.clone()).unwrap();
    let mut second = FileStore::open(dir.path(), clock.clone()).unwrap();

    let lease = LivenessLease::new("solar", 60, LeaseAcquire::Atomic);
    lease.acquire(&mut first).unwrap();
    assert!(
        LivenessLease::new("solar", 60, LeaseAcquire::Atomic)
            .acquire(&mut second)
            .is_err()
    );

    lease.release(&mut first).unwrap();
    LivenessLease::new("solar", 60, LeaseAcquire::Atomic)
        .acquire(&mut second)
        .unwrap();
}

#[test]
fn crashed_owner_lease_expires() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::at_millis(0);
    let mut crashed = FileStore::open(dir.path(), clock.clone()).unwrap();
    LivenessLease::new("solar", 60, LeaseAcquire::Atomic)
        .acquire(&mut crashed)
        .unwrap();
    drop(crashed);

    let mut next = FileStore::open(dir.path(), clock.clone()).unwrap();
    clock.advance(TimeDelta::seconds(30));
    assert!(
        LivenessLease::new("solar", 60, LeaseAcquire::CheckThenSet)
            .acquire(&mut next)
            .is_err()
    );
    clock.advance(TimeDelta::seconds(31));
    LivenessLease::new("solar", 60, LeaseAcquire::Atomic)
        .acquire(&mut next)
        .unwrap();
}

#[test]
fn corrupt_lease_document_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("solarslave.starttime.solar.json"),
        b"{ not json",
    )
    .unwrap();
    let mut store = FileStore::open(dir.path(), ManualClock::at_millis(0)).unwrap();
    let lease = LivenessLease::new("solar", 60, LeaseAcquire::Atomic);
    lease.acquire(&mut store).unwrap();
    assert!(store.exists(lease.key()).unwrap());
}
