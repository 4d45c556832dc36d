//! Per-core dispatch statistics.
//!
//! This module tracks what the trap layer has been doing on each core. It provides:
//! 1. **Trap mix:** Counts of traps taken, by cause.
//! 2. **Fast/slow split:** Fill-engine installs versus delegated faults.
//! 3. **Syscall outcomes:** Dispatched, fast-rejected, and context switches.

use crate::trap::cause::TrapCause;

/// Dispatch statistics for one core.
///
/// Updated only by the owning core's dispatcher; read out for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreStats {
    /// Traps with a `SysOp` cause.
    pub sysop_traps: u64,
    /// Traps with a data-read fault cause.
    pub read_fault_traps: u64,
    /// Traps with a data-write fault cause.
    pub write_fault_traps: u64,
    /// Traps with an instruction-fetch fault cause.
    pub exec_fault_traps: u64,
    /// Traps with an alignment fault cause.
    pub align_fault_traps: u64,
    /// External-interrupt traps.
    pub irq_traps: u64,
    /// Timer-tick traps.
    pub timer_traps: u64,
    /// Voluntary-preemption traps.
    pub preempt_traps: u64,

    /// Faults resolved on the fast path by a fill-engine install.
    pub fast_fills: u64,
    /// Faults delegated to the VM collaborator.
    pub slow_faults: u64,

    /// Valid syscalls handed to the syscall table.
    pub syscalls: u64,
    /// User syscalls fast-rejected with `-ENOSYS`.
    pub rejected_syscalls: u64,
    /// Context switches executed.
    pub switches: u64,
}

impl CoreStats {
    /// Counts one trap of the given cause.
    pub fn record(&mut self, cause: TrapCause) {
        match cause {
            TrapCause::SysOp => self.sysop_traps += 1,
            TrapCause::ReadFault => self.read_fault_traps += 1,
            TrapCause::WriteFault => self.write_fault_traps += 1,
            TrapCause::ExecFault => self.exec_fault_traps += 1,
            TrapCause::AlignFault => self.align_fault_traps += 1,
            TrapCause::ExternalInterrupt => self.irq_traps += 1,
            TrapCause::TimerTick => self.timer_traps += 1,
            TrapCause::Preempt => self.preempt_traps += 1,
        }
    }

    /// Total traps taken on this core.
    pub fn total_traps(&self) -> u64 {
        self.sysop_traps
            + self.read_fault_traps
            + self.write_fault_traps
            + self.exec_fault_traps
            + self.align_fault_traps
            + self.irq_traps
            + self.timer_traps
            + self.preempt_traps
    }
}
