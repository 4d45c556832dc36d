//! Memory access kinds.
//!
//! Categorizes the access a trap was attempting, which decides the permission
//! the TLB-fill engine must find and which translation-cache view (execute or
//! read/write) an installed entry exposes.

use std::fmt;

/// The kind of memory access that faulted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Data read.
    Read,
    /// Data write.
    Write,
    /// Instruction fetch.
    Exec,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::Exec => "exec",
        };
        write!(f, "{s}")
    }
}
