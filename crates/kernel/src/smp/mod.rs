//! Inter-core coordination.
//!
//! This module implements everything that crosses a core boundary:
//! 1. **IPI Signaling:** Per-core pending-operation masks with a doorbell
//!    through the interrupt controller.
//! 2. **TLB Shootdown:** Cross-core translation-cache invalidation requests.
//! 3. **Bring-up:** Waking and stopping secondary cores with bounded retry.
//!
//! No core ever reads or writes another core's live state directly; these
//! channels are the only cross-core paths.

/// Core bring-up and shutdown helpers.
pub mod bringup;

/// Pending-operation masks and the doorbell send path.
pub mod ipi;

/// Cross-core translation-cache invalidation queues.
pub mod shootdown;

pub use ipi::{IpiBoard, IpiKind, IpiStats};
pub use shootdown::{FlushQueues, FlushRequest};
