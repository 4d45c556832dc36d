//! Address spaces and the address-space table.
//!
//! An address space owns one two-level page table and a set of per-core ASID
//! slots. Slots start empty and are bound lazily the first time the space is
//! made current on a core, because a space that never runs on a core should
//! never consume one of that core's 4094 usable ids.

use super::asid::AsidAllocator;
use super::page_table::PageTable;

/// Identifier of an address space.
pub type SpaceId = u32;

/// One address space: a page table plus its per-core MMU-context bindings.
#[derive(Debug)]
pub struct AddressSpace {
    id: SpaceId,
    /// The space's two-level page table.
    pub table: PageTable,
    /// ASID bound on each core, `None` until the space first runs there.
    asids: Vec<Option<u16>>,
}

impl AddressSpace {
    fn new(id: SpaceId, num_cores: usize) -> Self {
        Self {
            id,
            table: PageTable::new(),
            asids: vec![None; num_cores],
        }
    }

    /// This space's identifier.
    pub fn id(&self) -> SpaceId {
        self.id
    }

    /// The ASID this space holds on `core`, if it has ever run there.
    pub fn asid_on(&self, core: usize) -> Option<u16> {
        self.asids[core]
    }

    /// Returns the space's ASID on `core`, binding one lazily on first use.
    ///
    /// Returns `None` only when the core's id space is exhausted; the caller
    /// decides what that means (it is not an eviction trigger).
    pub fn activate(&mut self, core: usize, alloc: &mut AsidAllocator) -> Option<u16> {
        if let Some(id) = self.asids[core] {
            return Some(id);
        }
        let id = alloc.get()?;
        self.asids[core] = Some(id);
        Some(id)
    }

    /// Takes every bound (core, ASID) pair, leaving all slots empty.
    ///
    /// Used at teardown; each returned id must be retired on its owning core
    /// (flush then release), never from here.
    pub fn take_bindings(&mut self) -> Vec<(usize, u16)> {
        let mut out = Vec::new();
        for (core, slot) in self.asids.iter_mut().enumerate() {
            if let Some(id) = slot.take() {
                out.push((core, id));
            }
        }
        out
    }
}

/// Table of live address spaces.
#[derive(Debug)]
pub struct SpaceTable {
    spaces: Vec<Option<AddressSpace>>,
    num_cores: usize,
}

impl SpaceTable {
    /// Creates an empty table for a machine with `num_cores` cores.
    pub fn new(num_cores: usize) -> Self {
        Self {
            spaces: Vec::new(),
            num_cores,
        }
    }

    /// Creates a new, empty address space and returns its id.
    pub fn create(&mut self) -> SpaceId {
        if let Some(idx) = self.spaces.iter().position(Option::is_none) {
            let id = idx as SpaceId;
            self.spaces[idx] = Some(AddressSpace::new(id, self.num_cores));
            return id;
        }
        let id = self.spaces.len() as SpaceId;
        self.spaces.push(Some(AddressSpace::new(id, self.num_cores)));
        id
    }

    /// Looks up a space by id.
    pub fn get(&self, id: SpaceId) -> Option<&AddressSpace> {
        self.spaces.get(id as usize).and_then(Option::as_ref)
    }

    /// Looks up a space by id, mutably.
    pub fn get_mut(&mut self, id: SpaceId) -> Option<&mut AddressSpace> {
        self.spaces.get_mut(id as usize).and_then(Option::as_mut)
    }

    /// Removes a space, returning its bound (core, ASID) pairs for retirement.
    pub fn destroy(&mut self, id: SpaceId) -> Option<Vec<(usize, u16)>> {
        let slot = self.spaces.get_mut(id as usize)?;
        let mut space = slot.take()?;
        Some(space.take_bindings())
    }
}
