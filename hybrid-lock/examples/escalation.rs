//! Read-to-write escalation without a release gap.
//!
//! Run with: `cargo run --example escalation`

use hybrid_lock::{LockManager, LockRuleset, ReaderWriterPolicy};

#[tokio::main]
async fn main() {
    let rules = LockRuleset::new(ReaderWriterPolicy);
    let manager: LockManager<&str> = LockManager::new();

    let read = manager
        .acquire("users/42", &rules, ReaderWriterPolicy::READ)
        .await;
    println!("holding read: {:?}", read);

    // One CAS swaps the read bit for the write bit; nobody can sneak in
    // between the two halves.
    let write = manager
        .change_level(read, ReaderWriterPolicy::WRITE)
        .await;
    println!("escalated: {:?}", write);

    // And back down once the mutation is done.
    let read = manager
        .change_level(write, ReaderWriterPolicy::READ)
        .await;
    println!("de-escalated: {:?}", read);

    read.release().unwrap();
}
