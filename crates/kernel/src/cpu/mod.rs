//! Per-core execution state and the context-switch primitive.
//!
//! This module owns what runs on each core:
//! 1. **Core State:** The per-core mutable state block (current thread,
//!    hardware flags, live registers, TLB, ASID allocator, statistics).
//! 2. **Threads:** Thread records with their privileged stacks.
//! 3. **Context Switch:** The save/restore primitive transferring a core
//!    between threads.

/// Per-core state block.
pub mod core_state;

/// The context-switch primitive.
pub mod switch;

/// Threads and the thread table.
pub mod thread;

pub use core_state::CoreState;
pub use switch::{switch_context, SwitchError};
pub use thread::{Thread, ThreadId, ThreadTable, NO_THREAD};
