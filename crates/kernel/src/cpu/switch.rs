//! Context-switch primitive.
//!
//! Transfers a core from one thread to another: saves the outgoing thread's
//! minimal register frame, restores the incoming thread's most recent frame,
//! and re-derives the hardware MMU-context tag and privilege mode for the
//! incoming thread. Reached only through the privileged-only switch call; the
//! dispatcher never decides *which* thread comes next.
//!
//! A `Minimal` frame suffices for the outgoing side because the switch call
//! site is an ordinary function call: the calling convention already made the
//! caller-saved registers dead.

use thiserror::Error;

use crate::common::constants::{ASID_USER_BIT, SYSOP_WIDTH};
use crate::frame::{FrameKind, StackError};
use crate::mm::{SpaceId, SpaceTable};
use crate::trap::cause::{SysOpcode, TrapCause};

use super::core_state::CoreState;
use super::thread::{ThreadId, ThreadTable};

/// Ways a context switch can fail.
///
/// Every variant is a protocol violation: the switch call is privileged-only
/// and its arguments come from kernel code, so a bad id or a bad stack means
/// an invariant upstream already broke. The dispatcher converts these into a
/// fatal with a diagnostic dump.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SwitchError {
    /// A switch argument named a thread that does not exist.
    #[error("switch to unknown thread {0}")]
    UnknownThread(ThreadId),
    /// The incoming thread's address space does not exist.
    #[error("thread references unknown address space {0}")]
    UnknownSpace(SpaceId),
    /// Saving or restoring a frame failed.
    #[error("switch frame error: {0}")]
    Stack(#[from] StackError),
    /// The core's MMU-context id space is exhausted.
    #[error("no free MMU context on this core")]
    NoContext,
}

/// Switches `core` from `prev` to `next`.
///
/// With `prev` present, the outgoing thread's live context is saved as a
/// `Minimal` frame on its privileged stack; with `prev` absent the outgoing
/// context is discarded (boot handoff, thread exit). The incoming thread's
/// most recent frame is popped and restored, with:
///
/// * resume PC taken from the popped frame, advanced past the trapping
///   opcode when that frame was produced by a syscall;
/// * `%1` carrying the outgoing thread id (the switch call's return value)
///   when `prev` is present, else the frame's own saved `%1` when the frame
///   is `Full` (a `Minimal` frame never captured it, so the live value
///   stands);
/// * privilege mode on resume derived from the incoming thread's
///   privileged-stack emptiness;
/// * the hardware MMU-context tag re-derived from the incoming thread's
///   address space, lazily binding an ASID on first run here, with a local
///   ASID-scoped flush when the thread migrated from another core.
///
/// # Errors
///
/// Any [`SwitchError`]; the core's live state is left unchanged on the
/// save-side errors, partially switched states never escape because restore
/// errors occur before any live-register write.
pub fn switch_context(
    core: &mut CoreState,
    threads: &mut ThreadTable,
    spaces: &mut SpaceTable,
    prev: Option<ThreadId>,
    next: ThreadId,
    opcode: SysOpcode,
) -> Result<(), SwitchError> {
    if let Some(prev_id) = prev {
        let prev_t = threads
            .get_mut(prev_id)
            .ok_or(SwitchError::UnknownThread(prev_id))?;
        prev_t
            .stack
            .push(FrameKind::Minimal, TrapCause::SysOp, opcode, &core.live)?;
    }

    let next_t = threads
        .get_mut(next)
        .ok_or(SwitchError::UnknownThread(next))?;
    let frame = next_t.stack.pop()?;

    frame.restore_into(&mut core.live);
    let mut pc = frame.pc();
    if frame.cause == TrapCause::SysOp {
        pc = pc.wrapping_add(SYSOP_WIDTH);
    }
    core.live.pc = pc;
    match prev {
        Some(prev_id) => core.live.file.set_ret(prev_id),
        // A Minimal frame never captured %1; the live value stands.
        None if frame.kind == FrameKind::Full => core.live.file.set_ret(frame.ret()),
        None => {}
    }

    let to_user = next_t.in_user();

    let space = spaces
        .get_mut(next_t.space)
        .ok_or(SwitchError::UnknownSpace(next_t.space))?;
    let asid = space
        .activate(core.id(), &mut core.asids)
        .ok_or(SwitchError::NoContext)?;

    // A thread migrating in may have left stale translations here from an
    // earlier tenure; drop everything tagged with its context.
    match next_t.last_core {
        Some(last) if last != core.id() => core.tlb.flush_asid(asid),
        _ => {}
    }
    next_t.last_core = Some(core.id());

    core.hw_asid = u32::from(asid) | if to_user { ASID_USER_BIT } else { 0 };
    core.current = next;
    core.stats.switches += 1;
    Ok(())
}
