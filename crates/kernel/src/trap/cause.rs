//! Trap causes and the raw trap detail.
//!
//! This module defines what the hardware delivers atomically with every entry
//! into privileged mode:
//! 1. **Trap Cause:** Why the transition happened; immutable for one dispatch.
//! 2. **Sysopcode:** The opaque detail word accompanying `SysOp` causes — a
//!    call tag for true system calls, or the original instruction encoding
//!    for operations the hardware could not execute itself.
//! 3. **Trap Event:** The (cause, detail, fault address) triple one dispatch
//!    consumes.

use std::fmt;

use crate::common::{Access, VirtAddr};

/// Reason the hardware entered privileged mode.
///
/// Produced by the hardware atomically with delivery to the dispatcher; never
/// re-derived in software.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapCause {
    /// System call or an operation the hardware could not execute.
    SysOp,
    /// Translation/permission fault on a data read.
    ReadFault,
    /// Translation/permission fault on a data write.
    WriteFault,
    /// Translation/permission fault on an instruction fetch.
    ExecFault,
    /// Misaligned access fault.
    AlignFault,
    /// External device or inter-core interrupt.
    ExternalInterrupt,
    /// Timer tick.
    TimerTick,
    /// Voluntary preemption request.
    Preempt,
}

impl TrapCause {
    /// Decodes the hardware cause register value.
    pub fn from_raw(val: u32) -> Option<Self> {
        match val {
            0 => Some(Self::SysOp),
            1 => Some(Self::ReadFault),
            2 => Some(Self::WriteFault),
            3 => Some(Self::ExecFault),
            4 => Some(Self::AlignFault),
            5 => Some(Self::ExternalInterrupt),
            6 => Some(Self::TimerTick),
            7 => Some(Self::Preempt),
            _ => None,
        }
    }

    /// Encodes the cause for storage in a register frame.
    pub fn to_raw(self) -> u32 {
        match self {
            Self::SysOp => 0,
            Self::ReadFault => 1,
            Self::WriteFault => 2,
            Self::ExecFault => 3,
            Self::AlignFault => 4,
            Self::ExternalInterrupt => 5,
            Self::TimerTick => 6,
            Self::Preempt => 7,
        }
    }

    /// Returns true for the four memory-fault causes.
    pub fn is_fault(self) -> bool {
        matches!(
            self,
            Self::ReadFault | Self::WriteFault | Self::ExecFault | Self::AlignFault
        )
    }

    /// The access kind a translation fault was attempting, if any.
    ///
    /// Alignment faults carry no translation permission and return `None`.
    pub fn access(self) -> Option<Access> {
        match self {
            Self::ReadFault => Some(Access::Read),
            Self::WriteFault => Some(Access::Write),
            Self::ExecFault => Some(Access::Exec),
            _ => None,
        }
    }
}

impl fmt::Display for TrapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SysOp => "SysOp",
            Self::ReadFault => "ReadFault",
            Self::WriteFault => "WriteFault",
            Self::ExecFault => "ExecFault",
            Self::AlignFault => "AlignFault",
            Self::ExternalInterrupt => "ExternalInterrupt",
            Self::TimerTick => "TimerTick",
            Self::Preempt => "Preempt",
        };
        write!(f, "{s}")
    }
}

/// Tag value identifying a true system call in a sysopcode.
pub const SYSOP_TAG_SYSCALL: u32 = 0x01;

/// The raw detail word accompanying a `SysOp` trap.
///
/// For system calls the low byte holds [`SYSOP_TAG_SYSCALL`]; any other tag
/// is the encoding of an instruction the hardware bounced to software, whose
/// operand fields can be decoded for emulation or diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SysOpcode(pub u32);

impl SysOpcode {
    /// Returns the raw encoding.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// The operation tag (low byte).
    pub fn tag(self) -> u32 {
        self.0 & 0xFF
    }

    /// True if this detail word identifies a system call.
    pub fn is_syscall(self) -> bool {
        self.tag() == SYSOP_TAG_SYSCALL
    }

    /// Destination operand field of a bounced instruction (bits 8..=11).
    pub fn rd(self) -> usize {
        ((self.0 >> 8) & 0xF) as usize
    }

    /// Source operand field of a bounced instruction (bits 12..=15).
    pub fn rs(self) -> usize {
        ((self.0 >> 12) & 0xF) as usize
    }
}

impl fmt::Display for SysOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Everything the hardware delivers for one dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrapEvent {
    /// Why privileged mode was entered.
    pub cause: TrapCause,
    /// Raw trap detail; meaningful only for `SysOp` causes.
    pub opcode: SysOpcode,
    /// Faulting address; meaningful only for fault causes.
    pub fault_addr: VirtAddr,
}

impl TrapEvent {
    /// Builds an event for a non-fault cause.
    pub fn of(cause: TrapCause) -> Self {
        Self {
            cause,
            opcode: SysOpcode::default(),
            fault_addr: VirtAddr::new(0),
        }
    }

    /// Builds a `SysOp` event from its detail word.
    pub fn sysop(opcode: u32) -> Self {
        Self {
            cause: TrapCause::SysOp,
            opcode: SysOpcode(opcode),
            fault_addr: VirtAddr::new(0),
        }
    }

    /// Builds a fault event.
    pub fn fault(cause: TrapCause, addr: VirtAddr) -> Self {
        Self {
            cause,
            opcode: SysOpcode::default(),
            fault_addr: addr,
        }
    }
}
