use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::trace;

use crate::error::LockError;
use crate::holder::Holder;
use crate::ruleset::{LockPolicy, LockRuleset};
use crate::token::LockToken;

/// Delay between attempts in the wait variants. Wake latency under
/// contention is bounded by this, nothing below it.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Keyed lock table: one lock-free state machine per resource key.
///
/// Each manager owns its own key map; managers never share holder state.
/// Entries appear on first touch of a key and are kept for the manager's
/// lifetime — with unbounded distinct keys the table only grows, so
/// embedders with churning key spaces need an eviction layer of their own.
///
/// The handle is cheap to clone (`Arc` inside); clones all address the
/// same table, which is how tokens carry their way back in.
///
/// Drive one manager with one ruleset: a key's counter storage is sized
/// for the ruleset that first touches it.
pub struct LockManager<K> {
    holders: Arc<DashMap<K, Arc<Holder>>>,
}

impl<K> Clone for LockManager<K> {
    fn clone(&self) -> Self {
        Self {
            holders: Arc::clone(&self.holders),
        }
    }
}

impl<K: Eq + Hash + Clone + fmt::Debug> Default for LockManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone + fmt::Debug> LockManager<K> {
    pub fn new() -> Self {
        Self {
            holders: Arc::new(DashMap::new()),
        }
    }

    fn holder_for<P: LockPolicy>(&self, key: &K, rules: &LockRuleset<P>) -> Arc<Holder> {
        let holder = self
            .holders
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Holder::new(rules.matrix().shared_level_count())))
            .clone();
        holder.touch();
        holder
    }

    /// One attempt to acquire `level` on `key`.
    ///
    /// `None` is the normal contention outcome — the current holders admit
    /// no such move, or the one CAS lost a race — and leaves all state
    /// untouched. There is no retry inside; pair with your own backoff or
    /// use [`acquire`](Self::acquire).
    ///
    /// # Panics
    ///
    /// If `level` is not a level of `rules`, or on first use of a ruleset
    /// whose level count is outside `1..=31`.
    pub fn try_acquire<P: LockPolicy>(
        &self,
        key: K,
        rules: &LockRuleset<P>,
        level: u8,
    ) -> Option<LockToken<K, P>> {
        let holder = self.holder_for(&key, rules);
        match holder.try_enter(rules.matrix(), level) {
            Some(shared_count) => {
                trace!(key = ?key, level, shared_count, "lock acquired");
                Some(LockToken::new(
                    level,
                    key,
                    self.clone(),
                    rules.clone(),
                    shared_count,
                ))
            }
            None => {
                trace!(key = ?key, level, "lock refused");
                None
            }
        }
    }

    /// Acquire `level` on `key`, polling until it succeeds.
    ///
    /// Retries [`try_acquire`](Self::try_acquire) every millisecond on the
    /// tokio timer. Unbounded and unfair: a stream of competing winners can
    /// starve a waiter indefinitely. The task suspends between attempts;
    /// no thread is pinned.
    pub async fn acquire<P: LockPolicy>(
        &self,
        key: K,
        rules: &LockRuleset<P>,
        level: u8,
    ) -> LockToken<K, P> {
        loop {
            if let Some(token) = self.try_acquire(key.clone(), rules, level) {
                return token;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Release the level held by `token`.
    ///
    /// Fails with [`LockError::AlreadyReleased`] if the token was already
    /// consumed, [`LockError::NotLocked`] if its key has no state here
    /// (a token from some other manager). Both are caller bugs: tolerating
    /// them silently would corrupt the shared counters other holders rely
    /// on.
    pub fn release<P: LockPolicy>(&self, token: &LockToken<K, P>) -> Result<(), LockError> {
        token.consume()?;
        let holder = self
            .holders
            .get(token.key())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LockError::NotLocked)?;
        holder.leave(token.rules().matrix(), token.level());
        trace!(key = ?token.key(), level = token.level(), "lock released");
        Ok(())
    }

    /// One attempt to change `token`'s level in place, without releasing.
    ///
    /// Succeeds only when the currently observed word is the entrance of a
    /// legal two-bit move from `token.level()` to `new_level`; the swap is
    /// a single CAS, so no intermediate state is ever observable. On
    /// refusal the original token comes back unchanged in `Err`.
    ///
    /// # Panics
    ///
    /// If the token's key was never registered with this manager.
    pub fn try_change_level<P: LockPolicy>(
        &self,
        token: LockToken<K, P>,
        new_level: u8,
    ) -> Result<LockToken<K, P>, LockToken<K, P>> {
        let holder = match self.holders.get(token.key()) {
            Some(entry) => Arc::clone(entry.value()),
            None => panic!("lock token key is not registered with this manager"),
        };
        if holder.try_switch(token.rules().matrix(), token.level(), new_level) {
            trace!(key = ?token.key(), from = token.level(), to = new_level, "lock level changed");
            Ok(token.escalated(new_level))
        } else {
            Err(token)
        }
    }

    /// Change `token`'s level, polling until it succeeds.
    ///
    /// Same contract as [`try_change_level`](Self::try_change_level),
    /// retried every millisecond.
    pub async fn change_level<P: LockPolicy>(
        &self,
        mut token: LockToken<K, P>,
        new_level: u8,
    ) -> LockToken<K, P> {
        loop {
            match self.try_change_level(token, new_level) {
                Ok(changed) => return changed,
                Err(unchanged) => {
                    token = unchanged;
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }
}
