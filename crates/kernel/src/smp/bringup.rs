//! Core bring-up and shutdown helpers.
//!
//! Bring-up is asymmetric: the boot core rings a parked secondary's doorbell
//! to wake it, the secondary marks itself online and acknowledges with a
//! `StartAck` signal, and the boot core waits for the online transition under
//! a conservative timeout. All failure paths are logged and returned to the
//! caller; a misbehaving secondary never halts the core that tried to start
//! it.

use std::time::{Duration, Instant};

use crate::common::KernelError;
use crate::traits::InterruptController;

use super::ipi;

/// Wakes a parked core by ringing its doorbell, with retry.
///
/// No mailbox bit accompanies the wake: a parked core reacts to the doorbell
/// itself, before it is ready to drain signals.
///
/// # Errors
///
/// The doorbell failures from [`ipi::ring`].
pub fn wake(
    ctrl: &mut dyn InterruptController,
    dest: usize,
    timeout_ms: u64,
) -> Result<(), KernelError> {
    ipi::ring(ctrl, dest, timeout_ms)
}

/// Polls `ready` until it returns true or `timeout_ms` expires.
///
/// Returns whether the condition was met in time.
pub fn wait_for(timeout_ms: u64, mut ready: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if ready() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::yield_now();
    }
}
