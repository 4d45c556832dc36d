//! Trap dispatch and software-managed virtual memory for the mk32 processor.
//!
//! This crate implements the privileged backend an mk32 kernel port runs on:
//! 1. **Trap Dispatch:** The per-core loop routing every privileged-mode entry
//!    (syscalls, faults, interrupts, timer ticks, preemption).
//! 2. **Register Frames:** The Minimal/Full save/restore protocol on per-thread
//!    privileged stacks.
//! 3. **Virtual Memory:** Two-level page tables, the per-core translation
//!    cache, the software TLB-fill engine, and the ASID allocator.
//! 4. **SMP:** Inter-core signaling, TLB shootdown, and core bring-up.
//! 5. **Collaborators:** Narrow traits for the VM fault handler, clock events,
//!    IRQ dispatch, interrupt controller, and boot I/O.

/// Common types and constants (addresses, registers, errors, access kinds).
pub mod common;
/// Subsystem configuration (defaults and hierarchical config structures).
pub mod config;
/// Per-core execution state, threads, and the context-switch primitive.
pub mod cpu;
/// Register frames and the privileged stack.
pub mod frame;
/// Page tables, translation cache, fill engine, ASIDs, address spaces.
pub mod mm;
/// Inter-core signaling, shootdown, and bring-up.
pub mod smp;
/// Per-core dispatch statistics.
pub mod stats;
/// Trap causes, continuations, and the dispatcher.
pub mod trap;
/// Collaborator traits for external subsystems.
pub mod traits;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The trap/VM subsystem aggregate; construct with `Kernel::new`.
pub use crate::trap::dispatcher::{Collaborators, Kernel};
/// Continuations produced by dispatch.
pub use crate::trap::resume::{HandlerEntry, Resume};
/// The hardware-delivered trap triple.
pub use crate::trap::cause::{TrapCause, TrapEvent};
