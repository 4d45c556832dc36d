//! Trap dispatch.
//!
//! This module implements the per-core "sysret loop":
//! 1. **Causes:** The hardware-delivered trap cause and raw detail word.
//! 2. **Continuations:** The tagged `Resume` values dispatch produces.
//! 3. **Dispatcher:** The state machine routing every privileged-mode entry
//!    to its fast-path or slow-path completion.

/// Trap causes and the raw trap detail.
pub mod cause;

/// The dispatcher and the kernel aggregate it runs inside.
pub mod dispatcher;

/// Dispatch continuations.
pub mod resume;

pub use cause::{SysOpcode, TrapCause, TrapEvent};
pub use dispatcher::{Collaborators, Kernel};
pub use resume::{HandlerEntry, Resume};
