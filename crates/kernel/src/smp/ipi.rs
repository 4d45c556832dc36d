//! Inter-processor signaling.
//!
//! Each core owns a pending-operation bitmask mutated with atomic
//! read-modify-write. A sender sets the signal bit in the target's mask,
//! issues a full fence, then rings the target's doorbell through the
//! interrupt controller; a receiver that observes the doorbell is therefore
//! guaranteed to observe the bit. The receiver drains its mask with an atomic
//! swap-to-zero loop until empty, so a signal posted between two swaps is
//! picked up by the next iteration and none is lost to a check/clear race.

use std::sync::atomic::{fence, AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::error;

use crate::common::KernelError;
use crate::traits::{DoorbellOutcome, InterruptController};

/// The cross-core signal kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpiKind {
    /// Ask the target core to reschedule.
    Reschedule = 0,
    /// Ask the target core to run its queued cross-core requests.
    CallFunc = 1,
    /// Ask the target core to go offline.
    Stop = 2,
    /// A freshly-started core acknowledging bring-up to the boot core.
    StartAck = 3,
}

impl IpiKind {
    /// Every kind, in drain order.
    pub const ALL: [Self; 4] = [Self::Reschedule, Self::CallFunc, Self::Stop, Self::StartAck];

    /// The mask bit for this kind.
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Delivery statistics for one core's mailbox.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IpiStats {
    delivered: [u64; 4],
    /// Doorbells taken with nothing pending (a sender's bit was already
    /// drained by an earlier doorbell).
    pub empty_drains: u64,
}

impl IpiStats {
    /// Signals of the given kind this core has executed.
    pub fn delivered(&self, kind: IpiKind) -> u64 {
        self.delivered[kind as usize]
    }
}

/// The per-core pending-signal mailboxes.
pub struct IpiBoard {
    masks: Vec<AtomicU32>,
    stats: Vec<Mutex<IpiStats>>,
}

impl std::fmt::Debug for IpiBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpiBoard")
            .field("cores", &self.masks.len())
            .finish()
    }
}

impl IpiBoard {
    /// Creates mailboxes for `num_cores` cores.
    pub fn new(num_cores: usize) -> Self {
        Self {
            masks: (0..num_cores).map(|_| AtomicU32::new(0)).collect(),
            stats: (0..num_cores).map(|_| Mutex::new(IpiStats::default())).collect(),
        }
    }

    /// Number of mailboxes.
    pub fn num_cores(&self) -> usize {
        self.masks.len()
    }

    /// Sets one pending bit in `dest`'s mask.
    pub fn post(&self, dest: usize, kind: IpiKind) {
        self.masks[dest].fetch_or(kind.bit(), Ordering::SeqCst);
    }

    /// Raw pending mask of `core`, for diagnostics.
    pub fn pending(&self, core: usize) -> u32 {
        self.masks[core].load(Ordering::SeqCst)
    }

    /// Drains `core`'s mask until empty, returning every observed signal.
    ///
    /// Bits accumulated between swap iterations are picked up before the
    /// drain returns; each set bit yields its kind exactly once per posting.
    pub fn drain(&self, core: usize) -> Vec<IpiKind> {
        let mut kinds = Vec::new();
        loop {
            let bits = self.masks[core].swap(0, Ordering::SeqCst);
            if bits == 0 {
                break;
            }
            for kind in IpiKind::ALL {
                if bits & kind.bit() != 0 {
                    kinds.push(kind);
                }
            }
        }
        let mut stats = self.stats[core]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if kinds.is_empty() {
            stats.empty_drains += 1;
        }
        for kind in &kinds {
            stats.delivered[*kind as usize] += 1;
        }
        kinds
    }

    /// Snapshot of `core`'s delivery statistics.
    pub fn stats(&self, core: usize) -> IpiStats {
        *self.stats[core]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rings `dest`'s doorbell, retrying while the controller is not ready.
///
/// # Errors
///
/// [`KernelError::InvalidTarget`] on an invalid destination,
/// [`KernelError::CoreUnreachable`] when the retry budget expires. Both are
/// logged; neither affects the local core.
pub fn ring(
    ctrl: &mut dyn InterruptController,
    dest: usize,
    timeout_ms: u64,
) -> Result<(), KernelError> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        match ctrl.target(dest) {
            DoorbellOutcome::Delivered(_) => return Ok(()),
            DoorbellOutcome::NotReady => {
                if Instant::now() >= deadline {
                    error!(core = dest, timeout_ms, "doorbell retry budget exhausted");
                    return Err(KernelError::CoreUnreachable {
                        core: dest,
                        waited_ms: timeout_ms,
                    });
                }
                std::hint::spin_loop();
            }
            DoorbellOutcome::Invalid => {
                error!(core = dest, "invalid doorbell destination");
                return Err(KernelError::InvalidTarget { core: dest });
            }
        }
    }
}

/// Posts one signal to `dest` and rings its doorbell.
///
/// The fence between the post and the ring is the ordering guarantee the
/// receiver relies on: observing the doorbell implies observing the bit.
///
/// # Errors
///
/// Propagates the doorbell failures from [`ring`]; the pending bit stays set
/// either way, so a later doorbell still delivers the signal.
pub fn send(
    board: &IpiBoard,
    ctrl: &mut dyn InterruptController,
    dest: usize,
    kind: IpiKind,
    timeout_ms: u64,
) -> Result<(), KernelError> {
    if dest >= board.num_cores() {
        error!(core = dest, "signal to nonexistent core");
        return Err(KernelError::InvalidTarget { core: dest });
    }
    board.post(dest, kind);
    fence(Ordering::SeqCst);
    ring(ctrl, dest, timeout_ms)
}
