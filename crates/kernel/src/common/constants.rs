//! System-wide constants for the mk32 trap/VM subsystem.
//!
//! Groups the architectural numbers every component agrees on:
//! 1. **Paging:** Page geometry for the two-level software-walked page table.
//! 2. **ASIDs:** Size of the MMU-context id space and its reserved ids.
//! 3. **Registers:** Architectural register indices and file size.
//! 4. **Syscalls:** Valid and reserved call-number ranges, privileged call numbers.
//! 5. **Errnos:** The few error values the dispatcher itself produces.

/// Number of bits in the page offset (4 KiB pages).
pub const PAGE_SHIFT: u32 = 12;

/// Size of one page in bytes.
pub const PAGE_SIZE: u32 = 1 << PAGE_SHIFT;

/// Mask selecting the page-base bits of an address.
pub const PAGE_MASK: u32 = !(PAGE_SIZE - 1);

/// Number of entries in a first-level page directory (top 10 address bits).
pub const PGD_ENTRIES: usize = 1024;

/// Number of entries in a second-level page table (middle 10 address bits).
pub const PTE_ENTRIES: usize = 1024;

/// Number of address-space ids per core (12-bit id space).
pub const NR_ASIDS: usize = 1 << 12;

/// Reserved id meaning "this address space has never run on this core".
pub const ASID_NONE: u16 = 0;

/// Reserved id for the initial kernel address space, usable before the
/// allocator itself is initialized.
pub const ASID_INIT: u16 = 1;

/// Qualifier bit OR'd into the hardware ASID tag when resuming to user mode.
pub const ASID_USER_BIT: u32 = 1 << 12;

/// Number of general-purpose registers.
pub const NR_GPRS: usize = 16;

/// Register index of the stack pointer (`%0`).
pub const REG_SP: usize = 0;

/// Register index of the primary argument/return-value register (`%1`).
pub const REG_RET: usize = 1;

/// Register index of the thread pointer (`%12`).
pub const REG_TP: usize = 12;

/// Register index of the scratch register carrying the syscall number (`%13`).
pub const REG_SR: usize = 13;

/// Register index of the frame pointer (`%14`).
pub const REG_FP: usize = 14;

/// Register index of the return-address register (`%15`).
pub const REG_RP: usize = 15;

/// Byte width of the trapping `sysop` encoding; the amount the program
/// counter advances when a syscall completes.
pub const SYSOP_WIDTH: u32 = 2;

/// Syscall numbers and ranges.
pub mod nr {
    /// One past the highest user-visible syscall number.
    pub const SYSCALLS: u32 = 452;

    /// First number of the reserved internal range (rejected from user mode).
    pub const INTERNAL_START: u32 = 440;

    /// Last number of the reserved internal range (inclusive).
    pub const INTERNAL_END: u32 = 447;

    /// Privileged-only context-switch call.
    pub const SWITCH: u32 = 440;

    /// Privileged-only raw write to the boot I/O channel.
    pub const BOOT_WRITE: u32 = 441;

    /// Privileged-only raw read from the boot I/O channel.
    pub const BOOT_READ: u32 = 442;

    /// Privileged-only seek on the boot I/O channel.
    pub const BOOT_SEEK: u32 = 443;

    /// Privileged-only terminate-machine hypercall.
    pub const BOOT_EXIT: u32 = 444;
}

/// "Function not implemented" errno delivered for invalid user syscalls.
pub const ENOSYS: u32 = 38;
