//! Software-managed virtual memory backend.
//!
//! This module implements the memory-management half of the subsystem:
//! 1. **ASID Allocation:** The per-core MMU-context id space.
//! 2. **Page Tables:** The two-level software-walked page table.
//! 3. **Translation Cache:** The per-core (page, ASID)-tagged TLB model.
//! 4. **Fill Engine:** The software TLB-fill fast path run on translation misses.
//! 5. **Address Spaces:** Page table plus lazily-bound per-core ASID slots.

/// MMU-context (ASID) allocator.
pub mod asid;

/// Software TLB-fill engine.
pub mod fill;

/// Two-level page table and page-table entries.
pub mod page_table;

/// Address spaces and the address-space table.
pub mod space;

/// Per-core translation cache.
pub mod tlb;

pub use asid::AsidAllocator;
pub use fill::{fill, FillOutcome};
pub use page_table::{PageTable, Pte};
pub use space::{AddressSpace, SpaceId, SpaceTable};
pub use tlb::{Tlb, TlbView};
