//! Kernel error and fatal-condition definitions.
//!
//! This module defines the error handling for the trap/VM subsystem. It provides:
//! 1. **Fatal Conditions:** Protocol violations that halt a core after a
//!    diagnostic dump; there is no safe recovery from them.
//! 2. **Recoverable Errors:** Cross-core communication failures and the other
//!    caller-visible error codes.
//! 3. **Diagnostics:** The register/stack dump attached to every fatal.

use std::fmt;

use thiserror::Error;

use super::reg::LiveRegs;

/// Diagnostic state captured when a core hits a fatal condition.
///
/// Mirrors what the halt path prints: the live register context and a window
/// of the privileged stack the core was using.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagDump {
    /// Core that hit the condition.
    pub core: usize,
    /// Live register context at the time of the violation.
    pub regs: LiveRegs,
    /// Topmost words of the current thread's privileged stack.
    pub stack: Vec<u32>,
}

impl fmt::Display for DiagDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "core {}:", self.core)?;
        write!(f, "{}", self.regs)?;
        for (i, w) in self.stack.iter().enumerate() {
            if i % 4 == 0 {
                write!(f, "\nstk+{:<3}", i * 4)?;
            }
            write!(f, " {w:#010x}")?;
        }
        writeln!(f)
    }
}

/// A protocol violation: an invariant load-bearing for all other dispatch
/// logic failed, and the only correct action is to halt the core.
///
/// Produced for traps that recorded masking state says were impossible,
/// recursive fault entry, privileged-stack corruption, and invalid
/// privileged-only call numbers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("fatal: {reason}\n{dump}")]
pub struct Fatal {
    /// Human-readable description of the violated invariant.
    pub reason: String,
    /// Diagnostic dump captured before halting.
    pub dump: DiagDump,
}

/// Errors surfaced by the trap/VM subsystem to its callers.
///
/// Fatal conditions are wrapped here so callers can uniformly `?` them; all
/// other variants are recoverable and never halt the local core.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A protocol violation; the affected core must halt.
    #[error(transparent)]
    Fatal(#[from] Fatal),

    /// The interrupt controller reported the doorbell destination invalid.
    #[error("core {core}: invalid interrupt destination")]
    InvalidTarget {
        /// The rejected destination core.
        core: usize,
    },

    /// A remote core did not become reachable within the retry budget.
    #[error("core {core}: not responding after {waited_ms} ms")]
    CoreUnreachable {
        /// The unresponsive core.
        core: usize,
        /// How long the sender retried before giving up.
        waited_ms: u64,
    },

    /// A secondary core did not come online within the bring-up timeout.
    #[error("core {core}: startup timeout")]
    StartupTimeout {
        /// The core that failed to start.
        core: usize,
    },
}
