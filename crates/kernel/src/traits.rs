//! Collaborator traits for external subsystems.
//!
//! This module defines the narrow contracts through which the dispatcher talks
//! to the rest of the kernel. It provides:
//! 1. **Fault Resolution:** The generic VM collaborator servicing slow-path faults.
//! 2. **Clock Events:** The timer-callback subsystem run on every tick.
//! 3. **IRQ Dispatch:** The generic interrupt layer devices register with.
//! 4. **Interrupt Controller:** Acknowledge and doorbell primitives.
//! 5. **Boot I/O:** The bootstrap hypercall channel used before general I/O exists.
//!
//! The scheduler has no trait here on purpose: the dispatcher never selects a
//! thread itself, it only executes the context-switch call it is handed, with
//! explicit prev/next identities as arguments.

use crate::common::VirtAddr;
use crate::trap::cause::TrapCause;

/// What the VM collaborator did with a delegated fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultResolution {
    /// A backing page was established; the trapped context can retry.
    Resolved,
    /// The fault was resolved against the faulting thread (it will be
    /// terminated or signaled); the trapped context must not retry.
    ResolvedFatal,
    /// Resolution was handed further up (e.g. blocked on I/O); the trapped
    /// context stays suspended.
    Deferred,
}

/// Generic virtual-memory fault handler.
///
/// Called only from the slow path, after the fill engine has either missed or
/// refused. Expected to use the host VM subsystem's page-table and VMA
/// abstractions; its internals are outside this crate.
pub trait FaultResolver {
    /// Resolves one fault at `addr` caused by `cause`.
    fn resolve_fault(&mut self, addr: VirtAddr, cause: TrapCause) -> FaultResolution;
}

/// Clock-event subsystem entry point.
pub trait ClockEvents {
    /// Runs the expired timer callbacks for `core`.
    ///
    /// Returns `true` if the callbacks left reschedule work pending.
    fn timer_tick(&mut self, core: usize) -> bool;
}

/// Generic interrupt dispatch layer.
pub trait IrqDispatch {
    /// Delivers one acknowledged interrupt source to its registered handler.
    ///
    /// Returns `true` if handling left reschedule work pending.
    fn dispatch(&mut self, core: usize, src: u32) -> bool;
}

/// Result of an interrupt-controller acknowledge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckOutcome {
    /// A device interrupt from the given source id.
    Source(u32),
    /// An inter-core doorbell; the pending-signal mailbox must be drained.
    InterCore,
    /// Nothing pending.
    NoSource,
}

/// Result of ringing a remote core's doorbell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DoorbellOutcome {
    /// The doorbell was accepted by the given destination.
    Delivered(usize),
    /// The destination exists but cannot take the doorbell yet; retry.
    NotReady,
    /// The destination does not exist; hard failure.
    Invalid,
}

/// The interrupt-controller primitives.
pub trait InterruptController {
    /// Claims the highest-priority pending interrupt for `core`.
    ///
    /// `enable` re-enables the claimed source after the acknowledge, the way
    /// a level-triggered controller re-arms a line.
    fn acknowledge(&mut self, core: usize, enable: bool) -> AckOutcome;

    /// Rings the doorbell of `dest`.
    fn target(&mut self, dest: usize) -> DoorbellOutcome;
}

/// The boot I/O channel behind the bootstrap hypercalls.
///
/// A narrow, temporary surface for kernel startup code only; it is not a
/// general I/O ABI and is never reachable from unprivileged code.
pub trait BootIo {
    /// Reads up to `len` bytes into guest memory at `addr`; returns the count
    /// read, or a negative errno as `u32`.
    fn read(&mut self, fd: u32, addr: u32, len: u32) -> u32;

    /// Writes `len` bytes from guest memory at `addr`; returns the count
    /// written, or a negative errno as `u32`.
    fn write(&mut self, fd: u32, addr: u32, len: u32) -> u32;

    /// Repositions the channel offset; returns the new offset, or a negative
    /// errno as `u32`.
    fn seek(&mut self, fd: u32, offset: u32, whence: u32) -> u32;

    /// Terminates the machine with the given exit code.
    fn exit(&mut self, code: u32);
}
