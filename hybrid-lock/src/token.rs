use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::Ordering;

use crate::atomics::AtomicBool;
use crate::error::LockError;
use crate::manager::LockManager;
use crate::ruleset::{LockPolicy, LockRuleset};

/// Proof of one successful acquire (or level change) on one key.
///
/// Produced only by [`LockManager`] operations and consumed exactly once:
/// the first [`release`](Self::release) performs the real transition, any
/// later call fails with [`LockError::AlreadyReleased`] and changes
/// nothing. Dropping a token without releasing it leaves the level held
/// for good — there is no drop glue, on purpose: release touches shared
/// state and the caller decides when that happens.
///
/// Equality and hashing consider `(level, key)` only, as a convenience for
/// bookkeeping collections; the engine never relies on them.
#[must_use = "dropping a lock token without releasing it leaves the level held"]
pub struct LockToken<K, P> {
    level: u8,
    key: K,
    manager: LockManager<K>,
    rules: LockRuleset<P>,
    shared_count: u32,
    released: AtomicBool,
}

impl<K, P> LockToken<K, P> {
    pub(crate) fn new(
        level: u8,
        key: K,
        manager: LockManager<K>,
        rules: LockRuleset<P>,
        shared_count: u32,
    ) -> Self {
        Self {
            level,
            key,
            manager,
            rules,
            shared_count,
            released: AtomicBool::new(false),
        }
    }

    /// The lock level this token holds.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// The resource key this token holds a level on.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Holders of this self-shared level beyond the first, observed right
    /// after acquisition. Always `0` for exclusive levels.
    pub fn shared_count(&self) -> u32 {
        self.shared_count
    }

    /// Whether this token has already been consumed by a release.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn rules(&self) -> &LockRuleset<P> {
        &self.rules
    }

    /// Flip the release-once guard; whoever flips it owns the real release.
    pub(crate) fn consume(&self) -> Result<(), LockError> {
        if self.released.swap(true, Ordering::AcqRel) {
            Err(LockError::AlreadyReleased)
        } else {
            Ok(())
        }
    }

    /// Rebuild the token at `new_level` after a successful level change.
    /// The shared snapshot resets: a change lands on the entrance word
    /// itself, never through the counter path.
    pub(crate) fn escalated(self, new_level: u8) -> Self {
        Self {
            level: new_level,
            key: self.key,
            manager: self.manager,
            rules: self.rules,
            shared_count: 0,
            released: AtomicBool::new(false),
        }
    }
}

impl<K, P> LockToken<K, P>
where
    K: Eq + Hash + Clone + fmt::Debug,
    P: LockPolicy,
{
    /// Release the held level through the manager that issued this token.
    ///
    /// Equivalent to [`LockManager::release`].
    pub fn release(&self) -> Result<(), LockError> {
        self.manager.release(self)
    }
}

impl<K: PartialEq, P> PartialEq for LockToken<K, P> {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level && self.key == other.key
    }
}

impl<K: Eq, P> Eq for LockToken<K, P> {}

impl<K: Hash, P> Hash for LockToken<K, P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.level.hash(state);
        self.key.hash(state);
    }
}

impl<K: fmt::Debug, P> fmt::Debug for LockToken<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockToken")
            .field("level", &self.level)
            .field("key", &self.key)
            .field("shared_count", &self.shared_count)
            .field("released", &self.is_released())
            .finish()
    }
}
