//! Miri-compatible tests for the synchronous API surface.
//! The wait variants poll on the tokio time driver, which miri can't run;
//! everything else in the crate is runtime-free and exercised here.

use hybrid_lock::{LockError, LockManager, LockMatrix, LockRuleset, ReaderWriterPolicy};

const READ: u8 = ReaderWriterPolicy::READ;
const WRITE: u8 = ReaderWriterPolicy::WRITE;

fn rw() -> (LockManager<u32>, LockRuleset<ReaderWriterPolicy>) {
    (LockManager::new(), LockRuleset::new(ReaderWriterPolicy))
}

#[test]
fn acquire_and_release() {
    let (manager, rules) = rw();

    let token = manager.try_acquire(1, &rules, WRITE).unwrap();
    assert_eq!(token.level(), WRITE);
    token.release().unwrap();
    assert!(manager.try_acquire(1, &rules, WRITE).is_some());
}

#[test]
fn readers_share_and_gate_a_writer() {
    let (manager, rules) = rw();

    let a = manager.try_acquire(1, &rules, READ).unwrap();
    let b = manager.try_acquire(1, &rules, READ).unwrap();
    assert!(manager.try_acquire(1, &rules, WRITE).is_none());

    a.release().unwrap();
    assert!(manager.try_acquire(1, &rules, WRITE).is_none());
    b.release().unwrap();
    assert!(manager.try_acquire(1, &rules, WRITE).is_some());
}

#[test]
fn double_release_is_refused() {
    let (manager, rules) = rw();

    let token = manager.try_acquire(1, &rules, READ).unwrap();
    token.release().unwrap();
    assert_eq!(token.release(), Err(LockError::AlreadyReleased));
}

#[test]
fn escalation_round_trip() {
    let (manager, rules) = rw();

    let read = manager.try_acquire(1, &rules, READ).unwrap();
    let write = manager.try_change_level(read, WRITE).unwrap();
    assert!(manager.try_acquire(1, &rules, READ).is_none());
    let read = manager.try_change_level(write, READ).unwrap();
    read.release().unwrap();
}

#[test]
fn matrix_compiles_lazily_once() {
    let rules = LockRuleset::new(ReaderWriterPolicy);

    let first = rules.matrix() as *const LockMatrix;
    let second = rules.matrix() as *const LockMatrix;
    assert_eq!(first, second);
    assert_eq!(rules.matrix().level_count(), 2);
}
