use thiserror::Error;

/// Misuse failures for release paths.
///
/// Contention is never reported through this type: a refused acquire is
/// `None`, a refused level change hands the original token back. These
/// variants mean the caller broke the single-release contract, and the
/// operation performed no state change.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The token's key has no lock state registered with this manager.
    #[error("object is not locked by this manager")]
    NotLocked,
    /// The token was already consumed by an earlier release.
    #[error("lock token was already released")]
    AlreadyReleased,
}
