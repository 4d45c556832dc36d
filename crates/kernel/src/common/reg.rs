//! Architectural register file.
//!
//! This module holds the live register state a core exposes to the dispatcher:
//! 1. **Register File:** The 16 general-purpose registers (`%0`..`%15`).
//! 2. **Live Context:** Register file plus program counter, as exported by the
//!    hardware's "read the unprivileged register file" primitive.
//! 3. **Named Access:** Helpers for the architecturally special registers
//!    (SP, return value, TP, SR, FP, RP).

use std::fmt;

use super::constants::{NR_GPRS, REG_FP, REG_RET, REG_RP, REG_SP, REG_SR, REG_TP};

/// The mk32 general-purpose register file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegisterFile {
    gprs: [u32; NR_GPRS],
}

impl RegisterFile {
    /// Creates a zeroed register file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a general-purpose register.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= 16`; register indices are produced by decode and are
    /// always in range.
    #[inline(always)]
    pub fn read(&self, idx: usize) -> u32 {
        self.gprs[idx]
    }

    /// Writes a general-purpose register.
    #[inline(always)]
    pub fn write(&mut self, idx: usize, val: u32) {
        self.gprs[idx] = val;
    }

    /// Stack pointer (`%0`).
    pub fn sp(&self) -> u32 {
        self.gprs[REG_SP]
    }

    /// Sets the stack pointer.
    pub fn set_sp(&mut self, val: u32) {
        self.gprs[REG_SP] = val;
    }

    /// Primary argument/return-value register (`%1`).
    pub fn ret(&self) -> u32 {
        self.gprs[REG_RET]
    }

    /// Sets the primary return-value register.
    pub fn set_ret(&mut self, val: u32) {
        self.gprs[REG_RET] = val;
    }

    /// Thread pointer (`%12`).
    pub fn tp(&self) -> u32 {
        self.gprs[REG_TP]
    }

    /// Sets the thread pointer.
    pub fn set_tp(&mut self, val: u32) {
        self.gprs[REG_TP] = val;
    }

    /// Scratch register carrying the syscall number (`%13`).
    pub fn sr(&self) -> u32 {
        self.gprs[REG_SR]
    }

    /// Frame pointer (`%14`).
    pub fn fp(&self) -> u32 {
        self.gprs[REG_FP]
    }

    /// Return-address register (`%15`).
    pub fn rp(&self) -> u32 {
        self.gprs[REG_RP]
    }

    /// Sets the return-address register.
    pub fn set_rp(&mut self, val: u32) {
        self.gprs[REG_RP] = val;
    }
}

/// Live register context of a core: register file plus program counter.
///
/// This is what the privileged "export live register" primitive reads and what
/// the privileged return primitive consumes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiveRegs {
    /// The general-purpose register file.
    pub file: RegisterFile,
    /// Program counter of the trapped context.
    pub pc: u32,
}

impl fmt::Display for LiveRegs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pc {:#010x}", self.pc)?;
        for (i, chunk) in self.file.gprs.chunks(4).enumerate() {
            let base = i * 4;
            writeln!(
                f,
                "%{:<2} {:#010x}  %{:<2} {:#010x}  %{:<2} {:#010x}  %{:<2} {:#010x}",
                base,
                chunk[0],
                base + 1,
                chunk[1],
                base + 2,
                chunk[2],
                base + 3,
                chunk[3]
            )?;
        }
        Ok(())
    }
}
