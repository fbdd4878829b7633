//! Minimal reader/writer example.
//!
//! Run with: `cargo run --example reader_writer`

use hybrid_lock::{LockManager, LockRuleset, ReaderWriterPolicy};

fn main() {
    let rules = LockRuleset::new(ReaderWriterPolicy);
    let manager: LockManager<u64> = LockManager::new();

    // Readers pile onto page 7
    let a = manager
        .try_acquire(7, &rules, ReaderWriterPolicy::READ)
        .expect("free key");
    let b = manager
        .try_acquire(7, &rules, ReaderWriterPolicy::READ)
        .expect("readers share");
    println!("readers on page 7: {:?}, {:?}", a, b);

    // A writer has to wait for both
    assert!(manager
        .try_acquire(7, &rules, ReaderWriterPolicy::WRITE)
        .is_none());
    println!("writer refused while readers hold");

    a.release().unwrap();
    b.release().unwrap();

    let w = manager
        .try_acquire(7, &rules, ReaderWriterPolicy::WRITE)
        .expect("free after both readers left");
    println!("writer in: {:?}", w);
    w.release().unwrap();
}
