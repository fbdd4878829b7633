//! Transition tables compiled from a [`LockPolicy`].
//!
//! A resource's lock state is one 32-bit word:
//! - `bits[30:0]` = one bit per lock level, set while at least one holder
//!   holds that level
//! - `bits[31]` = sharing-check flag: a self-shared counter adjustment is
//!   in progress; no table entry matches a flagged word, so every other
//!   transition stalls until the flag is cleared
//!
//! Compilation enumerates every word the policy allows, then derives every
//! legal single-CAS move between them: plain acquires (set one bit),
//! releases (the same pairs read backwards), counter-adjustment moves for
//! self-shared levels (raise the flag over an already-set bit), and
//! two-bit escalations. The runtime never searches or allocates; it looks
//! a move up by word and attempts exactly that compare-and-swap.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ruleset::LockPolicy;

/// One legal atomic move between two lock-state words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Word the move applies to.
    pub entrance: u32,
    /// Word the move produces.
    pub exit: u32,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#b} -> {:#b}", self.entrance, self.exit)
    }
}

/// Single-level moves for one lock level, indexed both ways.
///
/// Most levels in small schemes end up with exactly one pair; that case is
/// matched directly against the slice instead of paying a map probe.
#[derive(Debug)]
struct LevelPaths {
    /// Every legal move for this level, ordered by entrance word.
    pairs: Vec<Transition>,
    by_entrance: Option<FxHashMap<u32, Transition>>,
    by_exit: Option<FxHashMap<u32, Transition>>,
}

impl LevelPaths {
    fn index(pairs: Vec<Transition>) -> Self {
        if pairs.len() <= 1 {
            return Self {
                pairs,
                by_entrance: None,
                by_exit: None,
            };
        }
        let by_entrance = pairs.iter().map(|p| (p.entrance, *p)).collect();
        let by_exit = pairs.iter().map(|p| (p.exit, *p)).collect();
        Self {
            pairs,
            by_entrance: Some(by_entrance),
            by_exit: Some(by_exit),
        }
    }

    fn lookup_entrance(&self, word: u32) -> Option<Transition> {
        match &self.by_entrance {
            Some(map) => map.get(&word).copied(),
            None => self.pairs.first().copied().filter(|p| p.entrance == word),
        }
    }

    fn lookup_exit(&self, word: u32) -> Option<Transition> {
        match &self.by_exit {
            Some(map) => map.get(&word).copied(),
            None => self.pairs.first().copied().filter(|p| p.exit == word),
        }
    }
}

/// Flat O(1) transition tables for one [`LockPolicy`], built once per
/// [`LockRuleset`](crate::LockRuleset) and shared by every operation
/// using it.
#[derive(Debug)]
pub struct LockMatrix {
    level_count: u8,
    /// Dense counter slot per self-shared level, `None` for exclusive ones.
    shared_slots: Box<[Option<u8>]>,
    shared_levels: u8,
    paths: Box<[LevelPaths]>,
    /// Escalation moves for each ordered (from, to) pair, row-major.
    escalations: Box<[Box<[Transition]>]>,
}

impl LockMatrix {
    /// Reserved high bit: set transiently while a self-shared holder count
    /// is being adjusted. A flagged word matches no entrance, so it blocks
    /// every unrelated transition for the duration of the adjustment.
    pub const SHARING_CHECK: u32 = 1 << 31;

    /// Compile the policy into lookup tables.
    ///
    /// # Panics
    ///
    /// If `policy.level_count()` is outside `1..=31`.
    pub fn compile<P: LockPolicy + ?Sized>(policy: &P) -> Self {
        let level_count = policy.level_count();
        assert!(
            (1..=31).contains(&level_count),
            "lock level count must be in 1..=31, got {level_count}"
        );
        let n = level_count as usize;

        let mut shared_slots = vec![None; n];
        let mut shared_levels = 0u8;
        for level in 0..level_count {
            if policy.compatible(level, level) {
                shared_slots[level as usize] = Some(shared_levels);
                shared_levels += 1;
            }
        }

        // Bit pairs that may never be set together. Either direction
        // refusing forbids the combination.
        let mut forbidden = Vec::new();
        for held in 0..level_count {
            for acquiring in 0..level_count {
                if held != acquiring && !policy.compatible(held, acquiring) {
                    forbidden.push(1u32 << held | 1u32 << acquiring);
                }
            }
        }

        // Every representable word, minus the structurally forbidden ones.
        let states: Vec<u32> = (0..1u32 << n)
            .filter(|word| forbidden.iter().all(|mask| word & mask != *mask))
            .collect();
        let state_set: FxHashSet<u32> = states.iter().copied().collect();

        let mut paths = Vec::with_capacity(n);
        for level in 0..level_count {
            let bit = 1u32 << level;
            let mut pairs: Vec<Transition> = states
                .iter()
                .filter(|&&word| word & bit == 0 && state_set.contains(&(word | bit)))
                .map(|&word| Transition {
                    entrance: word,
                    exit: word | bit,
                })
                .collect();
            if shared_slots[level as usize].is_some() {
                // The bit is already up: the only legal move for another
                // acquirer of this level is raising the flag to bump the
                // holder count.
                pairs.extend(
                    states
                        .iter()
                        .filter(|&&word| word & bit != 0)
                        .map(|&word| Transition {
                            entrance: word,
                            exit: word | Self::SHARING_CHECK,
                        }),
                );
            }
            pairs.sort_by_key(|pair| pair.entrance);
            paths.push(LevelPaths::index(pairs));
        }

        let mut escalations = Vec::with_capacity(n * n);
        for from in 0..level_count {
            for to in 0..level_count {
                if from == to {
                    escalations.push(Box::default());
                    continue;
                }
                let bits = 1u32 << from | 1u32 << to;
                let mut pairs: Vec<Transition> = states
                    .iter()
                    .filter(|&&word| word != 0)
                    .filter_map(|&entrance| {
                        let exit = entrance ^ bits;
                        (exit != 0
                            && state_set.contains(&exit)
                            && (entrance < exit) == (from < to))
                            .then_some(Transition { entrance, exit })
                    })
                    .collect();
                pairs.sort_by_key(|pair| pair.entrance);
                escalations.push(pairs.into_boxed_slice());
            }
        }

        Self {
            level_count,
            shared_slots: shared_slots.into_boxed_slice(),
            shared_levels,
            paths: paths.into_boxed_slice(),
            escalations: escalations.into_boxed_slice(),
        }
    }

    pub fn level_count(&self) -> u8 {
        self.level_count
    }

    /// Whether multiple independent holders may hold `level` concurrently.
    pub fn is_self_shared(&self, level: u8) -> bool {
        self.shared_slots[self.level_index(level)].is_some()
    }

    /// Dense counter index for a self-shared level.
    pub fn shared_slot(&self, level: u8) -> Option<usize> {
        self.shared_slots[self.level_index(level)].map(usize::from)
    }

    /// Number of self-shared levels, i.e. counters a holder needs.
    pub fn shared_level_count(&self) -> u8 {
        self.shared_levels
    }

    /// The move acquiring one unit of `level` out of `word`, if any.
    pub fn entrance_pair(&self, level: u8, word: u32) -> Option<Transition> {
        self.paths[self.level_index(level)].lookup_entrance(word)
    }

    /// The move whose result is `word`, read backwards for release.
    pub fn exit_pair(&self, level: u8, word: u32) -> Option<Transition> {
        self.paths[self.level_index(level)].lookup_exit(word)
    }

    /// Every legal single-acquire move for `level`, ordered by entrance.
    pub fn entrance_pairs(&self, level: u8) -> &[Transition] {
        &self.paths[self.level_index(level)].pairs
    }

    /// Every legal one-CAS move dropping `from` and taking `to`.
    ///
    /// Direction is gated on level-index order matching word order, exactly
    /// as the states are generated: escalation "strength" follows the
    /// numeric level ordering of the policy.
    pub fn escalation_pairs(&self, from: u8, to: u8) -> &[Transition] {
        let from = self.level_index(from);
        let to = self.level_index(to);
        &self.escalations[from * self.level_count as usize + to]
    }

    fn level_index(&self, level: u8) -> usize {
        assert!(
            level < self.level_count,
            "lock level {level} out of range for a {}-level ruleset",
            self.level_count
        );
        level as usize
    }
}
