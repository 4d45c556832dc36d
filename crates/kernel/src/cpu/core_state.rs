//! Per-core state block.
//!
//! Everything a core mutates during dispatch lives here, indexed by core id
//! and touched only by the owning core; other cores reach it exclusively
//! through the inter-core signaling channel. Keeping the block explicit (one
//! struct, not scattered per-core arrays) is what makes the aliasing rules
//! checkable.

use crate::common::constants::ASID_INIT;
use crate::common::{DiagDump, Fatal, LiveRegs};
use crate::frame::PrivStack;
use crate::mm::{AsidAllocator, Tlb};
use crate::stats::CoreStats;

use super::thread::{ThreadId, NO_THREAD};

/// Mutable state of one core.
#[derive(Debug)]
pub struct CoreState {
    id: usize,
    /// Whether the core has been brought online.
    pub online: bool,
    /// Recorded interrupt-mask state: true while asynchronous traps are
    /// architecturally impossible. An interrupt cause arriving while set is a
    /// protocol violation.
    pub irqs_masked: bool,
    /// Reschedule work is pending for this core.
    pub need_resched: bool,
    /// The thread currently bound to this core; updated only by the
    /// context-switch primitive (and boot wiring).
    pub current: ThreadId,
    /// Live register context of the trapped thread, as exported by the
    /// privileged register-read primitive.
    pub live: LiveRegs,
    /// Hardware MMU-context tag in effect (ASID plus user qualifier bit).
    pub hw_asid: u32,
    /// This core's translation cache.
    pub tlb: Tlb,
    /// This core's MMU-context id allocator.
    pub asids: AsidAllocator,
    /// Dispatch statistics.
    pub stats: CoreStats,
}

impl CoreState {
    /// Creates the state block for core `id`.
    ///
    /// Only core 0 starts online; secondaries come up through the bring-up
    /// protocol. The initial MMU context is the reserved boot id.
    pub fn new(id: usize, tlb_entries: usize) -> Self {
        Self {
            id,
            online: id == 0,
            irqs_masked: false,
            need_resched: false,
            current: NO_THREAD,
            live: LiveRegs::default(),
            hw_asid: u32::from(ASID_INIT),
            tlb: Tlb::new(tlb_entries),
            asids: AsidAllocator::new(),
            stats: CoreStats::default(),
        }
    }

    /// This core's id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The ASID portion of the hardware context tag.
    pub fn active_asid(&self) -> u16 {
        (self.hw_asid & 0xFFF) as u16
    }

    /// Builds a fatal for a protocol violation observed on this core.
    ///
    /// Captures the live registers and, when available, a window of the
    /// current thread's privileged stack.
    pub fn fatal(&self, reason: impl Into<String>, stack: Option<&PrivStack>) -> Fatal {
        Fatal {
            reason: reason.into(),
            dump: DiagDump {
                core: self.id,
                regs: self.live,
                stack: stack.map(|s| s.dump_window(32)).unwrap_or_default(),
            },
        }
    }
}
