//! A custom three-level intent scheme, the kind a storage engine uses:
//! intent-read and intent-write coexist, exclusive excludes everything.
//!
//! Run with: `cargo run --example intent_levels`

use hybrid_lock::{LockManager, LockPolicy, LockRuleset};

struct IntentPolicy;

impl IntentPolicy {
    const INTENT_READ: u8 = 0;
    const INTENT_WRITE: u8 = 1;
    const EXCLUSIVE: u8 = 2;
}

impl LockPolicy for IntentPolicy {
    fn level_count(&self) -> u8 {
        3
    }

    fn compatible(&self, held: u8, acquiring: u8) -> bool {
        held != Self::EXCLUSIVE && acquiring != Self::EXCLUSIVE
    }
}

fn main() {
    let rules = LockRuleset::new(IntentPolicy);
    let manager: LockManager<u64> = LockManager::new();

    let ir = manager
        .try_acquire(1, &rules, IntentPolicy::INTENT_READ)
        .expect("free key");
    let iw = manager
        .try_acquire(1, &rules, IntentPolicy::INTENT_WRITE)
        .expect("intents coexist");
    println!("intent holders: {:?}, {:?}", ir, iw);

    assert!(manager
        .try_acquire(1, &rules, IntentPolicy::EXCLUSIVE)
        .is_none());
    println!("exclusive refused while intents hold");

    ir.release().unwrap();
    iw.release().unwrap();

    let x = manager
        .try_acquire(1, &rules, IntentPolicy::EXCLUSIVE)
        .expect("free after intents left");
    println!("exclusive in: {:?}", x);
    x.release().unwrap();
}
