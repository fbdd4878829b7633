//! Atomic imports that switch to loom's instrumented types under
//! `--cfg loom`, so the model tests drive the exact transition code that
//! ships.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicU32, AtomicU64};
#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64};
