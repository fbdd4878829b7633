//! Keyed, multi-level lock table built on **lock-free atomic bitmask state
//! machines** with pluggable compatibility policies.
//!
//! A [`LockManager`] maps arbitrary resource keys — page numbers, record
//! ids, session handles — to tiny per-key state machines: one atomic word,
//! one bit per lock level. Acquire, release and in-place level change are
//! each a single compare-and-swap against transition tables compiled ahead
//! of time from a [`LockPolicy`], so the hot path never takes an OS lock,
//! never searches, never allocates.
//!
//! You declare the scheme (how many levels, which pairs coexist); the
//! matrix compiler turns it into flat lookup tables; the engine runs it.
//! Levels a policy marks compatible with themselves are *self-shared*: any
//! number of holders may pile onto them, tracked by a per-level counter
//! serialized through a reserved flag bit.
//!
//! # Quick start
//!
//! ```rust
//! use hybrid_lock::{LockManager, LockRuleset, ReaderWriterPolicy};
//!
//! let rules = LockRuleset::new(ReaderWriterPolicy);
//! let manager = LockManager::new();
//!
//! // Two readers share page 7; a writer is refused until both leave.
//! let a = manager.try_acquire(7u64, &rules, ReaderWriterPolicy::READ).unwrap();
//! let b = manager.try_acquire(7u64, &rules, ReaderWriterPolicy::READ).unwrap();
//! assert!(manager.try_acquire(7u64, &rules, ReaderWriterPolicy::WRITE).is_none());
//!
//! a.release().unwrap();
//! b.release().unwrap();
//! let w = manager.try_acquire(7u64, &rules, ReaderWriterPolicy::WRITE).unwrap();
//! w.release().unwrap();
//! ```
//!
//! # Waiting
//!
//! `try_*` operations attempt exactly one CAS and report contention as a
//! refusal, never an error. The `async` variants poll on a short fixed
//! timer instead — no waiter queue, no fairness, wake latency bounded by
//! the poll interval:
//!
//! ```rust
//! use hybrid_lock::{LockManager, LockRuleset, ReaderWriterPolicy};
//!
//! # tokio_test::block_on(async {
//! let rules = LockRuleset::new(ReaderWriterPolicy);
//! let manager = LockManager::new();
//!
//! let held = manager.acquire("users/42", &rules, ReaderWriterPolicy::WRITE).await;
//! held.release().unwrap();
//! let token = manager.acquire("users/42", &rules, ReaderWriterPolicy::READ).await;
//! token.release().unwrap();
//! # });
//! ```
//!
//! # Changing levels in place
//!
//! A held level can be escalated (or de-escalated) without a release gap,
//! atomically — either both bits swap in one observable step or the token
//! comes back unchanged:
//!
//! ```rust
//! use hybrid_lock::{LockManager, LockRuleset, ReaderWriterPolicy};
//!
//! let rules = LockRuleset::new(ReaderWriterPolicy);
//! let manager = LockManager::new();
//!
//! let read = manager.try_acquire(1u32, &rules, ReaderWriterPolicy::READ).unwrap();
//! let write = manager.try_change_level(read, ReaderWriterPolicy::WRITE).unwrap();
//! assert_eq!(write.level(), ReaderWriterPolicy::WRITE);
//! write.release().unwrap();
//! ```
//!
//! # Custom policies
//!
//! Any pairwise-compatibility scheme with up to 31 levels works — the
//! policy is two pure functions:
//!
//! ```rust
//! use hybrid_lock::{LockManager, LockPolicy, LockRuleset};
//!
//! /// Levels 0 and 1 are intent modes sharing with each other;
//! /// level 2 excludes everything, including itself.
//! struct IntentPolicy;
//!
//! impl LockPolicy for IntentPolicy {
//!     fn level_count(&self) -> u8 { 3 }
//!     fn compatible(&self, held: u8, acquiring: u8) -> bool {
//!         held < 2 && acquiring < 2
//!     }
//! }
//!
//! let rules = LockRuleset::new(IntentPolicy);
//! let manager = LockManager::new();
//!
//! let a = manager.try_acquire(9u64, &rules, 0).unwrap();
//! let b = manager.try_acquire(9u64, &rules, 1).unwrap();
//! assert!(manager.try_acquire(9u64, &rules, 2).is_none());
//! a.release().unwrap();
//! b.release().unwrap();
//! ```
//!
//! # Contract
//!
//! - Refusal is the normal contention outcome and leaves all state
//!   untouched; only misuse (double release, foreign tokens) produces a
//!   [`LockError`].
//! - Tokens are consumed exactly once; there is no drop-time release.
//! - Distinct keys never interfere; a manager's key table only grows.
//! - Rulesets must stay immutable while any manager uses them — the
//!   compiled matrix is cached once and never invalidated.

mod atomics;
mod error;
mod holder;
mod manager;
mod matrix;
mod ruleset;
mod token;

pub use error::LockError;
pub use manager::LockManager;
pub use matrix::{LockMatrix, Transition};
pub use ruleset::{LockPolicy, LockRuleset, ReaderWriterPolicy};
pub use token::LockToken;
