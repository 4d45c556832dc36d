//! Software TLB-fill engine.
//!
//! Invoked on translation faults when the processor variant has no hardware
//! page-table walker. Every fill either installs exactly one
//! translation-cache entry and resumes on the fast path, or deterministically
//! escalates to the slow path; nothing here loops or retries.
//!
//! The cache probe comes first because it distinguishes two very different
//! situations: an entry that is present but lacks the required permission is
//! a protection violation the page table cannot cure (walking again would
//! grant nothing), while an absent entry is an ordinary miss worth a walk.

use super::page_table::{PageTable, Pte};
use super::tlb::Tlb;
use crate::common::{Access, VirtAddr};

/// Result of one fill attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillOutcome {
    /// One entry was installed; resume where the fault was taken.
    Installed,
    /// The fault needs the generic VM collaborator (missing mapping or
    /// permission violation); take the slow path.
    Escalate,
    /// The cache already grants the required permission, so the fault should
    /// have been impossible. Protocol violation; the caller must halt.
    UnexpectedHit,
}

/// Derives whether an installed or walked view satisfies the request.
fn grants(r: bool, w: bool, x: bool, user_ok: bool, access: Access, user: bool) -> bool {
    let perm = match access {
        Access::Read => r,
        Access::Write => w,
        Access::Exec => x,
    };
    perm && (!user || user_ok)
}

/// Attempts to service a translation fault from the page table.
///
/// # Arguments
///
/// * `tlb` - The faulting core's translation cache.
/// * `table` - The page table of the faulting thread's active address space.
/// * `asid` - The MMU-context id the installed entry is tagged with.
/// * `addr` - The faulting virtual address.
/// * `access` - The access kind derived from the trap cause.
/// * `user` - True if the trapped context was unprivileged.
///
/// # Returns
///
/// [`FillOutcome::Installed`] with exactly one new cache entry, or one of the
/// escalation outcomes; the cache is untouched in the latter cases.
pub fn fill(
    tlb: &mut Tlb,
    table: &PageTable,
    asid: u16,
    addr: VirtAddr,
    access: Access,
    user: bool,
) -> FillOutcome {
    if let Some(view) = tlb.lookup(addr, asid) {
        if grants(view.r, view.w, view.x, view.user, access, user) {
            return FillOutcome::UnexpectedHit;
        }
        // Present but insufficient: a walk cannot grant a permission the
        // page table does not have.
        return FillOutcome::Escalate;
    }

    let Some(pte) = table.walk(addr) else {
        return FillOutcome::Escalate;
    };
    if !grants(
        pte.can_read(),
        pte.can_write(),
        pte.can_exec(),
        pte.is_user(),
        access,
        user,
    ) {
        return FillOutcome::Escalate;
    }

    // Install only one of the two mutually-exclusive views: the execute view
    // for fetch faults, the read/write view otherwise.
    let view = match access {
        Access::Exec => pte.exec_view(),
        Access::Read | Access::Write => pte.data_view(),
    };
    tlb.insert(addr.page_base(), asid, view);

    FillOutcome::Installed
}
