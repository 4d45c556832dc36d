//! Register-frame store.
//!
//! Fixed-layout records of trapped register state, chained on each thread's
//! privileged stack. This module provides:
//! 1. **Frames:** The `Minimal`/`Full` variant record and its binary layout.
//! 2. **Privileged Stack:** Downward-growing storage with offset-based
//!    frame linkage and strict LIFO discipline.

/// Privileged stack and frame layout.
pub mod stack;

pub use stack::{FrameKind, PrivStack, SavedFrame, StackError};
