//! Common utilities and types used throughout the mk32 kernel backend.
//!
//! This module provides fundamental building blocks that are shared across all
//! components of the trap/VM subsystem. It includes:
//! 1. **Address Types:** Strong types for virtual and physical addresses.
//! 2. **Constants:** System-wide constants for pages, ASIDs, registers, and syscalls.
//! 3. **Access Kinds:** Definitions for categorizing memory accesses (Read/Write/Exec).
//! 4. **Error Handling:** The kernel error enum and the fatal-with-dump type.
//! 5. **Register Management:** The architectural register file.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Memory access kind definitions.
pub mod access;

/// Common constants used throughout the subsystem.
pub mod constants;

/// Error types and the fatal diagnostic dump.
pub mod error;

/// Register file implementation.
pub mod reg;

pub use access::Access;
pub use addr::{PhysAddr, VirtAddr};
pub use constants::{PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};
pub use error::{DiagDump, Fatal, KernelError};
pub use reg::{LiveRegs, RegisterFile};
