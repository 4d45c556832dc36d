//! Per-core translation cache (TLB model).
//!
//! A direct-mapped cache of (virtual page, ASID) to (physical page,
//! permission bits) mappings. Tagging every entry with the MMU-context id is
//! what lets one core hold several address spaces' translations at once
//! without cross-contamination. Entries are installed by the software
//! TLB-fill engine and invalidated explicitly by range, by ASID, or by full
//! flush; nothing ages out on its own.

use super::page_table::Pte;
use crate::common::VirtAddr;

/// A single entry in the translation cache.
#[derive(Clone, Copy, Default)]
struct TlbEntry {
    /// Virtual page number (tag).
    vpn: u32,
    /// Owning MMU-context id (tag).
    asid: u16,
    /// Entry validity flag.
    valid: bool,
    /// Physical page number plus permission bits, as one masked PTE view.
    view: Pte,
}

/// The permissions and target a lookup hit exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlbView {
    /// Physical page number.
    pub ppn: u32,
    /// Read permission.
    pub r: bool,
    /// Write permission.
    pub w: bool,
    /// Execute permission.
    pub x: bool,
    /// User-mode accessible.
    pub user: bool,
    /// Cacheable.
    pub cached: bool,
}

/// Translation cache structure.
pub struct Tlb {
    entries: Vec<TlbEntry>,
    /// Mask used for indexing (size - 1).
    mask: usize,
}

impl std::fmt::Debug for Tlb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let valid = self.entries.iter().filter(|e| e.valid).count();
        f.debug_struct("Tlb")
            .field("entries", &self.entries.len())
            .field("valid", &valid)
            .finish()
    }
}

impl Tlb {
    /// Creates a new translation cache with the specified size.
    ///
    /// `size` is rounded up to the next power of two so indexing can mask.
    pub fn new(size: usize) -> Self {
        let safe_size = if size.is_power_of_two() {
            size
        } else {
            size.next_power_of_two()
        };

        Self {
            entries: vec![TlbEntry::default(); safe_size],
            mask: safe_size - 1,
        }
    }

    /// Looks up the entry for a (page, ASID) pair.
    ///
    /// Returns the installed view if the tags match, otherwise `None`. A hit
    /// with insufficient permission is still a hit; the fill engine decides
    /// what that means.
    #[inline(always)]
    pub fn lookup(&self, vaddr: VirtAddr, asid: u16) -> Option<TlbView> {
        let vpn = vaddr.vpn();
        let idx = (vpn as usize) & self.mask;
        let entry = &self.entries[idx];

        if entry.valid && entry.vpn == vpn && entry.asid == asid {
            let v = entry.view;
            return Some(TlbView {
                ppn: v.ppn(),
                r: v.can_read(),
                w: v.can_write(),
                x: v.can_exec(),
                user: v.is_user(),
                cached: v.is_cached(),
            });
        }
        None
    }

    /// Installs one masked PTE view for a (page, ASID) pair.
    ///
    /// The caller supplies either the execute view or the read/write view;
    /// the two never coexist in one entry.
    pub fn insert(&mut self, vaddr: VirtAddr, asid: u16, view: Pte) {
        let vpn = vaddr.vpn();
        let idx = (vpn as usize) & self.mask;

        self.entries[idx] = TlbEntry {
            vpn,
            asid,
            valid: true,
            view,
        };
    }

    /// Flushes every entry.
    pub fn flush_all(&mut self) {
        for e in &mut self.entries {
            e.valid = false;
        }
    }

    /// Flushes every entry belonging to one MMU context.
    pub fn flush_asid(&mut self, asid: u16) {
        for e in &mut self.entries {
            if e.asid == asid {
                e.valid = false;
            }
        }
    }

    /// Flushes entries of one MMU context whose page falls in `[start, end)`.
    pub fn flush_range(&mut self, asid: u16, start: VirtAddr, end: VirtAddr) {
        let lo = start.vpn();
        let hi = if end.page_offset() != 0 {
            end.vpn() + 1
        } else {
            end.vpn()
        };
        for e in &mut self.entries {
            if e.valid && e.asid == asid && e.vpn >= lo && e.vpn < hi {
                e.valid = false;
            }
        }
    }
}
