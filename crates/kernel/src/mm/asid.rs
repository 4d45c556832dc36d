//! MMU-context (ASID) allocator.
//!
//! A bitmap-backed id space handing out the small integers used to tag
//! translation-cache entries. Ids are unique per core: an address space gets
//! one id per core it has run on, never a global one. Allocation is
//! round-robin from the last-granted id with a wraparound rescan, which makes
//! reuse lazy: an id is reassigned only after its previous owner released it.
//!
//! Two ids are permanently reserved: [`ASID_NONE`] ("has never run on this
//! core") and [`ASID_INIT`] (the first kernel address space at boot, before
//! the allocator itself exists).

use crate::common::constants::{ASID_INIT, ASID_NONE, NR_ASIDS};

const WORDS: usize = NR_ASIDS / 64;

/// Bitmap-backed allocator for one core's ASID space.
pub struct AsidAllocator {
    bitmap: [u64; WORDS],
    last: u16,
}

impl std::fmt::Debug for AsidAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsidAllocator")
            .field("in_use", &self.in_use_count())
            .field("last", &self.last)
            .finish()
    }
}

impl Default for AsidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AsidAllocator {
    /// Creates an allocator with only the reserved ids marked in use.
    pub fn new() -> Self {
        let mut a = Self {
            bitmap: [0; WORDS],
            last: ASID_NONE,
        };
        a.set(ASID_NONE);
        a.set(ASID_INIT);
        a
    }

    fn set(&mut self, id: u16) {
        self.bitmap[id as usize / 64] |= 1 << (id % 64);
    }

    fn clear(&mut self, id: u16) {
        self.bitmap[id as usize / 64] &= !(1 << (id % 64));
    }

    /// Returns true if `id` is currently marked in use.
    pub fn in_use(&self, id: u16) -> bool {
        self.bitmap[id as usize / 64] & (1 << (id % 64)) != 0
    }

    /// Number of ids currently marked in use, reserved ids included.
    pub fn in_use_count(&self) -> usize {
        self.bitmap.iter().map(|w| w.count_ones() as usize).sum()
    }

    fn next_zero(&self, from: u16) -> Option<u16> {
        (from as usize..NR_ASIDS)
            .find(|&i| !self.in_use(i as u16))
            .map(|i| i as u16)
    }

    /// Allocates the next free id, round-robin from the last grant.
    ///
    /// Wraps around and rescans from just past the reserved ids when the tail
    /// of the id space is exhausted. Returns `None` only when every
    /// non-reserved id is in use; exhaustion fails the allocation rather than
    /// evicting a live context.
    pub fn get(&mut self) -> Option<u16> {
        let mut ctx = self.next_zero(self.last + 1);
        if ctx.is_none() && self.last != ASID_NONE {
            ctx = self.next_zero(ASID_NONE + 1);
        }
        if let Some(id) = ctx {
            self.set(id);
            self.last = id;
        }
        ctx
    }

    /// Releases an id back to the pool.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `id` is one of the reserved ids; those are
    /// never handed out and must never be released.
    pub fn put(&mut self, id: u16) {
        debug_assert!(id != ASID_NONE && id != ASID_INIT);
        self.clear(id);
    }
}
