//! Cross-core translation-cache invalidation.
//!
//! A core never touches another core's translation cache directly. An
//! address-space-affecting change instead queues a flush request on every
//! core whose mask shows the space active, then signals `CallFunc`; each
//! target applies its own queue from inside its interrupt handler. Retire
//! requests additionally release the ASID back to the owning core's
//! allocator, which is why teardown must go through this channel rather than
//! calling `put` remotely.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::common::VirtAddr;
use crate::mm::{AsidAllocator, Tlb};

/// One queued invalidation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushRequest {
    /// Drop every entry.
    All,
    /// Drop every entry of one MMU context.
    Space {
        /// The context to flush.
        asid: u16,
    },
    /// Drop one context's entries in `[start, end)`.
    Range {
        /// The context to flush.
        asid: u16,
        /// First affected address.
        start: VirtAddr,
        /// One past the last affected address.
        end: VirtAddr,
    },
    /// Drop one context's entries and release its id (space teardown).
    Retire {
        /// The context being retired.
        asid: u16,
    },
}

/// Per-core queues of pending invalidation requests.
#[derive(Debug, Default)]
pub struct FlushQueues {
    queues: Vec<Mutex<VecDeque<FlushRequest>>>,
}

impl FlushQueues {
    /// Creates empty queues for `num_cores` cores.
    pub fn new(num_cores: usize) -> Self {
        Self {
            queues: (0..num_cores).map(|_| Mutex::new(VecDeque::new())).collect(),
        }
    }

    /// Queues a request for `core`.
    pub fn push(&self, core: usize, req: FlushRequest) {
        self.queues[core]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(req);
    }

    /// Number of requests pending for `core`.
    pub fn pending(&self, core: usize) -> usize {
        self.queues[core]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Applies and empties `core`'s queue against its own cache state.
    ///
    /// Called only by the owning core, from its `CallFunc` handler.
    pub fn apply(&self, core: usize, tlb: &mut Tlb, asids: &mut AsidAllocator) {
        let drained: Vec<FlushRequest> = self.queues[core]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for req in drained {
            match req {
                FlushRequest::All => tlb.flush_all(),
                FlushRequest::Space { asid } => tlb.flush_asid(asid),
                FlushRequest::Range { asid, start, end } => tlb.flush_range(asid, start, end),
                FlushRequest::Retire { asid } => {
                    tlb.flush_asid(asid);
                    asids.put(asid);
                }
            }
        }
    }
}
