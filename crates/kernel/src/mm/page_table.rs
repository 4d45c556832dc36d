//! Two-level page table for the mk32 software-walked MMU.
//!
//! This module implements the page-table structure the TLB-fill engine walks.
//! A two-level design is sufficient because the virtual address space is
//! bounded: a first-level directory indexed by the top 10 address bits and
//! second-level tables indexed by the middle 10 bits. A walk is two reads.

use crate::common::constants::{PGD_ENTRIES, PTE_ENTRIES};
use crate::common::{PhysAddr, VirtAddr, PAGE_MASK, PAGE_SHIFT};

/// Page-table entry present bit (bit 0).
const PTE_PRESENT_BIT: u32 = 1;

/// Page-table entry read permission bit (bit 1).
const PTE_READ_BIT: u32 = 1 << 1;

/// Page-table entry write permission bit (bit 2).
const PTE_WRITE_BIT: u32 = 1 << 2;

/// Page-table entry execute permission bit (bit 3).
const PTE_EXEC_BIT: u32 = 1 << 3;

/// Page-table entry user-accessible bit (bit 4).
const PTE_USER_BIT: u32 = 1 << 4;

/// Page-table entry cacheable bit (bit 5).
const PTE_CACHED_BIT: u32 = 1 << 5;

/// A strongly-typed wrapper around a raw 32-bit mk32 page-table entry.
///
/// The physical page base occupies the address bits above the page offset;
/// the low bits carry the permission flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pte(u32);

impl Pte {
    /// Builds a leaf entry mapping to `paddr` with the given permission bits.
    pub fn leaf(paddr: PhysAddr, r: bool, w: bool, x: bool, user: bool, cached: bool) -> Self {
        let mut v = (paddr.val() & PAGE_MASK) | PTE_PRESENT_BIT;
        if r {
            v |= PTE_READ_BIT;
        }
        if w {
            v |= PTE_WRITE_BIT;
        }
        if x {
            v |= PTE_EXEC_BIT;
        }
        if user {
            v |= PTE_USER_BIT;
        }
        if cached {
            v |= PTE_CACHED_BIT;
        }
        Self(v)
    }

    /// Creates an entry from its raw 32-bit value.
    pub fn from_raw(val: u32) -> Self {
        Self(val)
    }

    /// Returns the underlying raw 32-bit value.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Returns true if the present bit is set.
    pub fn is_present(self) -> bool {
        self.0 & PTE_PRESENT_BIT != 0
    }

    /// Returns true if the read bit is set.
    pub fn can_read(self) -> bool {
        self.0 & PTE_READ_BIT != 0
    }

    /// Returns true if the write bit is set.
    pub fn can_write(self) -> bool {
        self.0 & PTE_WRITE_BIT != 0
    }

    /// Returns true if the execute bit is set.
    pub fn can_exec(self) -> bool {
        self.0 & PTE_EXEC_BIT != 0
    }

    /// Returns true if the user-accessible bit is set.
    pub fn is_user(self) -> bool {
        self.0 & PTE_USER_BIT != 0
    }

    /// Returns true if the cacheable bit is set.
    pub fn is_cached(self) -> bool {
        self.0 & PTE_CACHED_BIT != 0
    }

    /// Extracts the physical page number.
    pub fn ppn(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }

    /// Returns the entry with the read/write bits cleared (execute view).
    pub fn exec_view(self) -> Self {
        Self(self.0 & !(PTE_READ_BIT | PTE_WRITE_BIT))
    }

    /// Returns the entry with the execute bit cleared (read/write view).
    pub fn data_view(self) -> Self {
        Self(self.0 & !PTE_EXEC_BIT)
    }
}

/// A second-level table of 1024 entries covering 4 MiB.
type Table = Box<[Pte; PTE_ENTRIES]>;

/// A two-level mk32 page table.
///
/// Second-level tables are allocated lazily on first map into their 4 MiB
/// region, matching how the kernel populates address spaces.
pub struct PageTable {
    dir: Vec<Option<Table>>,
}

impl std::fmt::Debug for PageTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let populated = self.dir.iter().filter(|t| t.is_some()).count();
        f.debug_struct("PageTable")
            .field("populated_tables", &populated)
            .finish()
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTable {
    /// Creates an empty page table.
    pub fn new() -> Self {
        let mut dir = Vec::with_capacity(PGD_ENTRIES);
        dir.resize_with(PGD_ENTRIES, || None);
        Self { dir }
    }

    fn dir_index(vaddr: VirtAddr) -> usize {
        (vaddr.val() >> 22) as usize
    }

    fn table_index(vaddr: VirtAddr) -> usize {
        ((vaddr.val() >> PAGE_SHIFT) & 0x3FF) as usize
    }

    /// Installs a leaf entry for the page containing `vaddr`.
    ///
    /// Allocates the second-level table if the 4 MiB region was untouched.
    pub fn map(&mut self, vaddr: VirtAddr, pte: Pte) {
        let table = self.dir[Self::dir_index(vaddr)]
            .get_or_insert_with(|| Box::new([Pte::default(); PTE_ENTRIES]));
        table[Self::table_index(vaddr)] = pte;
    }

    /// Removes the entry for the page containing `vaddr`, if any.
    pub fn unmap(&mut self, vaddr: VirtAddr) {
        if let Some(table) = &mut self.dir[Self::dir_index(vaddr)] {
            table[Self::table_index(vaddr)] = Pte::default();
        }
    }

    /// Walks the table for `vaddr`: two reads, directory then table.
    ///
    /// Returns `None` when the directory slot is unpopulated or the leaf entry
    /// is not present.
    pub fn walk(&self, vaddr: VirtAddr) -> Option<Pte> {
        let table = self.dir[Self::dir_index(vaddr)].as_ref()?;
        let pte = table[Self::table_index(vaddr)];
        pte.is_present().then_some(pte)
    }
}
