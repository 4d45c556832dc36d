//! Physical and Virtual Address types.
//!
//! This module defines strong types for the mk32 32-bit address spaces to
//! prevent accidental mixing. It provides:
//! 1. **Type Safety:** Virtual and physical addresses are distinct at compile time.
//! 2. **Page Arithmetic:** Helpers for page numbers, page offsets, and alignment.
//! 3. **MMU Integration:** The primary currency of the TLB-fill engine and page tables.

use std::fmt;

use super::constants::{PAGE_MASK, PAGE_SHIFT};

/// A virtual address in the mk32 address space.
///
/// Virtual addresses are what trapping code was using; they must be translated
/// through the software-managed translation cache before reaching memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u32);

/// A physical address in the mk32 address space.
///
/// Physical addresses come out of a page-table walk and are what translation
/// cache entries resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u32);

impl VirtAddr {
    /// Creates a new virtual address from a raw 32-bit value.
    #[inline(always)]
    pub fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Returns the raw 32-bit address value.
    #[inline(always)]
    pub fn val(self) -> u32 {
        self.0
    }

    /// Extracts the virtual page number (address bits above the page offset).
    #[inline(always)]
    pub fn vpn(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }

    /// Extracts the byte offset within the 4 KiB page.
    pub fn page_offset(self) -> u32 {
        self.0 & !PAGE_MASK
    }

    /// Returns the address rounded down to its page base.
    pub fn page_base(self) -> Self {
        Self(self.0 & PAGE_MASK)
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 32-bit value.
    #[inline(always)]
    pub fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Returns the raw 32-bit address value.
    #[inline(always)]
    pub fn val(self) -> u32 {
        self.0
    }

    /// Extracts the physical page number.
    #[inline(always)]
    pub fn ppn(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
