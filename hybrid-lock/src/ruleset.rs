use std::sync::{Arc, OnceLock};

use crate::matrix::LockMatrix;

/// Pairwise compatibility policy over a fixed set of lock levels.
///
/// Implementations are pure and stateless: the answers must never change
/// for the lifetime of any [`LockRuleset`] wrapping them, since the
/// compiled [`LockMatrix`] is cached once and never invalidated.
///
/// Levels are plain `u8` indices in `0..level_count()`, with caller-defined
/// meaning (read, write, intent-exclusive, ...). `compatible(x, x)` marks
/// level `x` *self-shared*: any number of independent holders may hold it
/// concurrently, tracked by a per-level counter.
pub trait LockPolicy: Send + Sync + 'static {
    /// Number of distinct lock levels. Must be in `1..=31`; the top bit of
    /// the state word is reserved for the sharing-check flag.
    fn level_count(&self) -> u8;

    /// Whether a holder at `held` admits another acquisition at
    /// `acquiring`. Checked in both directions for distinct levels: a state
    /// holding both is structurally forbidden if either direction refuses.
    fn compatible(&self, held: u8, acquiring: u8) -> bool;
}

struct RulesetInner<P> {
    policy: P,
    matrix: OnceLock<LockMatrix>,
}

/// A [`LockPolicy`] bundled with its lazily-compiled transition tables.
///
/// The matrix is built on first use and memoized thread-safely; every
/// operation on every [`LockManager`](crate::LockManager) using this
/// ruleset shares the one compiled copy. Cloning is cheap (an `Arc` bump),
/// which is how tokens carry their ruleset around.
pub struct LockRuleset<P> {
    inner: Arc<RulesetInner<P>>,
}

impl<P> Clone for LockRuleset<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: LockPolicy> LockRuleset<P> {
    pub fn new(policy: P) -> Self {
        Self {
            inner: Arc::new(RulesetInner {
                policy,
                matrix: OnceLock::new(),
            }),
        }
    }

    pub fn policy(&self) -> &P {
        &self.inner.policy
    }

    /// The compiled transition tables for this policy.
    ///
    /// # Panics
    ///
    /// On first call, if the policy's level count is outside `1..=31`.
    pub fn matrix(&self) -> &LockMatrix {
        self.inner
            .matrix
            .get_or_init(|| LockMatrix::compile(&self.inner.policy))
    }
}

/// The classic two-level scheme: [`READ`](Self::READ) is self-shared,
/// [`WRITE`](Self::WRITE) excludes everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderWriterPolicy;

impl ReaderWriterPolicy {
    pub const READ: u8 = 0;
    pub const WRITE: u8 = 1;
}

impl LockPolicy for ReaderWriterPolicy {
    fn level_count(&self) -> u8 {
        2
    }

    fn compatible(&self, held: u8, acquiring: u8) -> bool {
        held == Self::READ && acquiring == Self::READ
    }
}
