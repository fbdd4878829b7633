use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use hybrid_lock::{LockManager, LockRuleset, ReaderWriterPolicy};

const READ: u8 = ReaderWriterPolicy::READ;
const WRITE: u8 = ReaderWriterPolicy::WRITE;

const TASKS: usize = 8;
const OPS_PER_TASK: usize = 200;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_are_mutually_exclusive() {
    let manager: LockManager<u32> = LockManager::new();
    let rules = LockRuleset::new(ReaderWriterPolicy);
    let in_critical = Arc::new(AtomicBool::new(false));

    let mut handles = vec![];
    for _ in 0..TASKS {
        let manager = manager.clone();
        let rules = rules.clone();
        let in_critical = in_critical.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..OPS_PER_TASK {
                let token = manager.acquire(1, &rules, WRITE).await;
                assert!(
                    !in_critical.swap(true, Ordering::SeqCst),
                    "two writers inside the critical section"
                );
                tokio::task::yield_now().await;
                in_critical.store(false, Ordering::SeqCst);
                token.release().unwrap();
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_never_see_active_readers() {
    let manager: LockManager<u32> = LockManager::new();
    let rules = LockRuleset::new(ReaderWriterPolicy);
    let active_readers = Arc::new(AtomicU32::new(0));

    let mut handles = vec![];
    for _ in 0..TASKS / 2 {
        let manager = manager.clone();
        let rules = rules.clone();
        let active_readers = active_readers.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..OPS_PER_TASK {
                let token = manager.acquire(1, &rules, READ).await;
                active_readers.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                active_readers.fetch_sub(1, Ordering::SeqCst);
                token.release().unwrap();
            }
        }));
    }
    for _ in 0..TASKS / 2 {
        let manager = manager.clone();
        let rules = rules.clone();
        let active_readers = active_readers.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..OPS_PER_TASK {
                let token = manager.acquire(1, &rules, WRITE).await;
                assert_eq!(
                    active_readers.load(Ordering::SeqCst),
                    0,
                    "writer entered while readers were active"
                );
                tokio::task::yield_now().await;
                token.release().unwrap();
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reader_churn_leaves_no_residue() {
    let manager: LockManager<u32> = LockManager::new();
    let rules = LockRuleset::new(ReaderWriterPolicy);

    let mut handles = vec![];
    for _ in 0..TASKS {
        let manager = manager.clone();
        let rules = rules.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..OPS_PER_TASK {
                let token = manager.acquire(1, &rules, READ).await;
                token.release().unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // every shared hold was paired with a release, so the word is clear
    let writer = manager.try_acquire(1, &rules, WRITE).unwrap();
    writer.release().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn escalation_never_exposes_an_intermediate_state() {
    let manager: LockManager<u32> = LockManager::new();
    let rules = LockRuleset::new(ReaderWriterPolicy);
    let in_critical = Arc::new(AtomicBool::new(false));

    // One task rides read -> write escalations; the other hammers plain
    // write acquires. Exclusivity must hold through every switch.
    let escalator = {
        let manager = manager.clone();
        let rules = rules.clone();
        let in_critical = in_critical.clone();
        tokio::spawn(async move {
            for _ in 0..OPS_PER_TASK {
                let read = manager.acquire(1, &rules, READ).await;
                let write = manager.change_level(read, WRITE).await;
                assert!(
                    !in_critical.swap(true, Ordering::SeqCst),
                    "escalated writer overlapped another writer"
                );
                tokio::task::yield_now().await;
                in_critical.store(false, Ordering::SeqCst);
                write.release().unwrap();
            }
        })
    };
    let writer = {
        let manager = manager.clone();
        let rules = rules.clone();
        let in_critical = in_critical.clone();
        tokio::spawn(async move {
            for _ in 0..OPS_PER_TASK {
                if let Some(token) = manager.try_acquire(1, &rules, WRITE) {
                    assert!(
                        !in_critical.swap(true, Ordering::SeqCst),
                        "writer overlapped an escalated writer"
                    );
                    tokio::task::yield_now().await;
                    in_critical.store(false, Ordering::SeqCst);
                    token.release().unwrap();
                } else {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    escalator.await.unwrap();
    writer.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_make_progress_independently() {
    let manager: LockManager<u32> = LockManager::new();
    let rules = LockRuleset::new(ReaderWriterPolicy);

    let mut handles = vec![];
    for key in 0..TASKS as u32 {
        let manager = manager.clone();
        let rules = rules.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..OPS_PER_TASK {
                let token = manager.acquire(key, &rules, WRITE).await;
                token.release().unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parked_waiters_all_drain() {
    let manager: LockManager<u32> = LockManager::new();
    let rules = LockRuleset::new(ReaderWriterPolicy);

    let held = manager.try_acquire(1, &rules, WRITE).unwrap();

    let mut handles = vec![];
    for _ in 0..TASKS {
        let manager = manager.clone();
        let rules = rules.clone();
        handles.push(tokio::spawn(async move {
            let token = manager.acquire(1, &rules, WRITE).await;
            token.release().unwrap();
        }));
    }

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    held.release().unwrap();

    for handle in handles {
        handle.await.unwrap();
    }
}
