//! Dispatch continuations.
//!
//! The original hardware hands control to a collaborator by loading its entry
//! address into the privileged return primitive — a jump with no call-stack
//! relationship. Here that handoff is an explicit tagged continuation, which
//! keeps the dispatcher a pure state machine the test suite can observe.

use super::cause::TrapCause;
use crate::common::VirtAddr;

/// The external entry point a slow-path dispatch transfers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerEntry {
    /// The syscall table entry for `nr`; completion pops one frame via
    /// `ret_from_syscall`.
    Syscall {
        /// The validated call number.
        nr: u32,
    },
    /// The generic VM fault collaborator; completion pops one frame via
    /// `ret_from_exception`.
    Fault {
        /// The faulting address (or saved PC for bounced operations).
        addr: VirtAddr,
        /// The producing cause.
        cause: TrapCause,
    },
    /// Pending-work processing (reschedule and friends); completion pops one
    /// frame via `ret_from_exception`.
    PendingWork,
}

/// What the dispatcher decided to do with the trapped core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resume {
    /// Fast path: resume exactly where the trap was taken, with whatever the
    /// dispatcher wrote into the live registers. No frame was touched.
    ReturnToTrap,
    /// Slow path: a frame was pushed and control transfers to a collaborator
    /// with the given argument registers populated.
    DispatchTo {
        /// Which collaborator entry point receives control.
        entry: HandlerEntry,
        /// Values placed in the collaborator's argument registers.
        args: [u32; 2],
    },
    /// Halt the core until the next interrupt.
    Idle,
}
