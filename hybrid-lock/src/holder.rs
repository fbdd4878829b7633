//! Live lock state for one resource key.

use std::sync::atomic::Ordering;

use crate::atomics::{AtomicU32, AtomicU64};
use crate::matrix::LockMatrix;

fn ticks() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_micros() as u64)
}

/// Per-key lock state: the atomic word plus one counter per self-shared
/// level. Created on first touch of a key and kept for the lifetime of the
/// owning manager.
pub(crate) struct Holder {
    /// Bitmask of held levels; bit 31 is the transient sharing-check flag.
    word: AtomicU32,
    /// Holders *beyond the first* per self-shared level, indexed by the
    /// matrix's dense slot. The level's bit in `word` stands for one holder
    /// on its own. Only touched while the sharing-check flag is up.
    shared: Box<[AtomicU32]>,
    /// Microsecond stamp of the last acquire that touched this entry.
    /// Bookkeeping for eviction policies layered on top; never read here.
    last_used: AtomicU64,
}

impl Holder {
    pub(crate) fn new(shared_levels: u8) -> Self {
        Self {
            word: AtomicU32::new(0),
            shared: (0..shared_levels).map(|_| AtomicU32::new(0)).collect(),
            last_used: AtomicU64::new(0),
        }
    }

    pub(crate) fn touch(&self) {
        self.last_used.store(ticks(), Ordering::Relaxed);
    }

    /// One attempt to acquire one unit of `level`.
    ///
    /// Returns the self-shared holder-count snapshot on success (`0` for
    /// exclusive levels and for the first shared holder), `None` when the
    /// current word admits no such move or the CAS lost a race. Never
    /// retries; the caller owns the retry policy.
    pub(crate) fn try_enter(&self, matrix: &LockMatrix, level: u8) -> Option<u32> {
        let word = self.word.load(Ordering::Relaxed);
        let pair = matrix.entrance_pair(level, word)?;
        if self
            .word
            .compare_exchange(pair.entrance, pair.exit, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }
        if pair.exit & LockMatrix::SHARING_CHECK == 0 {
            return Some(0);
        }
        // We won the flag: the word matches no table entry until we store
        // it back, so the counter bump and the clearing store cannot race
        // with any other transition.
        let slot = match matrix.shared_slot(level) {
            Some(slot) => slot,
            // a flagged exit only comes from a self-shared synthetic pair
            None => unreachable!(),
        };
        let count = self.shared[slot].fetch_add(1, Ordering::Relaxed) + 1;
        self.word
            .store(pair.exit & !LockMatrix::SHARING_CHECK, Ordering::Release);
        Some(count)
    }

    /// Release one unit of `level`. Loops until it lands; only contends
    /// with transitions that themselves complete in bounded time.
    pub(crate) fn leave(&self, matrix: &LockMatrix, level: u8) {
        if let Some(slot) = matrix.shared_slot(level) {
            // Raise the sharing-check flag over whatever is there. Losing
            // the CAS means another flag-raiser got in first; reload and
            // try again.
            let mut clean = self.word.load(Ordering::Relaxed) & !LockMatrix::SHARING_CHECK;
            loop {
                match self.word.compare_exchange(
                    clean,
                    clean | LockMatrix::SHARING_CHECK,
                    Ordering::Acquire,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(actual) => clean = actual & !LockMatrix::SHARING_CHECK,
                }
            }
            if self.shared[slot].load(Ordering::Relaxed) == 0 {
                // Last holder out: take the real bit-clearing move.
                let pair = match matrix.exit_pair(level, clean) {
                    Some(pair) => pair,
                    None => unreachable!("level {level} released but not held in {clean:#x}"),
                };
                self.word.store(pair.entrance, Ordering::Release);
            } else {
                self.shared[slot].fetch_sub(1, Ordering::Relaxed);
                self.word.store(clean, Ordering::Release);
            }
        } else {
            // Only the holder that set this bit clears it, so the CAS can
            // lose only to unrelated transitions and eventually wins.
            let mut word = self.word.load(Ordering::Relaxed);
            loop {
                let clean = word & !LockMatrix::SHARING_CHECK;
                let pair = match matrix.exit_pair(level, clean) {
                    Some(pair) => pair,
                    None => unreachable!("level {level} released but not held in {clean:#x}"),
                };
                match self.word.compare_exchange(
                    pair.exit,
                    pair.entrance,
                    Ordering::Release,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => break,
                    Err(actual) => word = actual,
                }
            }
        }
    }

    /// One attempt to drop `from` and take `to` in a single CAS.
    ///
    /// Either both halves apply in one observable step or nothing changes.
    pub(crate) fn try_switch(&self, matrix: &LockMatrix, from: u8, to: u8) -> bool {
        let word = self.word.load(Ordering::Relaxed);
        let Some(pair) = matrix
            .escalation_pairs(from, to)
            .iter()
            .find(|pair| pair.entrance == word)
        else {
            return false;
        };
        self.word
            .compare_exchange(pair.entrance, pair.exit, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    #[cfg(test)]
    pub(crate) fn raw_word(&self) -> u32 {
        self.word.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn shared_count(&self, slot: usize) -> u32 {
        self.shared[slot].load(Ordering::Relaxed)
    }
}
