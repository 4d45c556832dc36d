//! Syscall-side dispatch tests.
//!
//! Covers the `SysOp` cause end to end:
//! - Fast rejection of invalid and reserved call numbers from user mode
//! - Delegation of valid calls and their completion
//! - The privileged-only bootstrap hypercalls
//! - Bounced operations routed to the fault collaborator

use mk32_kernel::common::constants::{nr, ASID_USER_BIT, ENOSYS, REG_SR};
use mk32_kernel::common::VirtAddr;
use mk32_kernel::trap::{HandlerEntry, Resume, TrapCause, TrapEvent};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::TestContext;

// ══════════════════════════════════════════════════════════
// 1. User-mode fast rejection
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(nr::SYSCALLS)]
#[case(u32::MAX)]
#[case(nr::INTERNAL_START)]
#[case(nr::SWITCH)]
#[case(nr::BOOT_EXIT)]
#[case(nr::INTERNAL_END)]
fn invalid_user_numbers_are_rejected_without_a_frame(#[case] bad_nr: u32) {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    let core = ctx.kernel.core_mut(0);
    core.live.pc = 0x500;
    core.live.file.write(REG_SR, bad_nr);

    let resume = ctx.kernel.dispatch(0, TrapEvent::sysop(0x01)).unwrap();
    assert_eq!(resume, Resume::ReturnToTrap);

    let core = ctx.kernel.core(0);
    assert_eq!(core.live.file.ret(), 0u32.wrapping_sub(ENOSYS));
    assert_eq!(core.live.pc, 0x502);
    assert_eq!(core.stats.rejected_syscalls, 1);
    assert!(ctx.kernel.thread(thread).unwrap().stack.is_empty());
}

// ══════════════════════════════════════════════════════════
// 2. Valid user syscalls
// ══════════════════════════════════════════════════════════

#[test]
fn valid_syscall_is_delegated_with_its_arguments() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    let core = ctx.kernel.core_mut(0);
    core.live.pc = 0x500;
    core.live.file.write(REG_SR, 63);
    core.live.file.set_ret(0x1234);

    let resume = ctx.kernel.dispatch(0, TrapEvent::sysop(0x01)).unwrap();
    assert_eq!(
        resume,
        Resume::DispatchTo {
            entry: HandlerEntry::Syscall { nr: 63 },
            args: [63, 0x1234],
        }
    );
    assert_eq!(ctx.kernel.thread(thread).unwrap().stack.depth(), 1);
    assert_eq!(ctx.kernel.core(0).stats.syscalls, 1);
}

#[test]
fn syscall_completion_restores_and_steps_past_the_opcode() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    let core = ctx.kernel.core_mut(0);
    core.live.pc = 0x500;
    core.live.file.write(REG_SR, 63);
    core.live.file.set_sp(0xCAFE_0000);

    ctx.kernel.dispatch(0, TrapEvent::sysop(0x01)).unwrap();
    // The syscall layer scrambles the live state while running; completion
    // must restore from the frame.
    let core = ctx.kernel.core_mut(0);
    core.live.file.set_sp(0);
    core.live.pc = 0xDEAD;

    ctx.kernel.ret_from_syscall(0, 0x5678).unwrap();
    let core = ctx.kernel.core(0);
    assert_eq!(core.live.file.ret(), 0x5678);
    assert_eq!(core.live.file.sp(), 0xCAFE_0000);
    assert_eq!(core.live.pc, 0x502);
    assert!(ctx.kernel.thread(thread).unwrap().stack.is_empty());
    assert_ne!(core.hw_asid & ASID_USER_BIT, 0);
}

#[test]
fn completion_without_a_frame_is_fatal() {
    let mut ctx = TestContext::new();
    ctx.boot_thread(0);
    let err = ctx.kernel.ret_from_syscall(0, 0).unwrap_err();
    assert!(err.reason.contains("syscall return"));
}

// ══════════════════════════════════════════════════════════
// 3. Privileged callers
// ══════════════════════════════════════════════════════════

#[test]
fn privileged_caller_with_a_user_number_is_fatal() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    ctx.enter_kernel(thread);
    ctx.kernel.core_mut(0).live.file.write(REG_SR, 63);

    let err = ctx.kernel.dispatch(0, TrapEvent::sysop(0x01)).unwrap_err();
    assert!(err.reason.contains("invalid privileged syscall number 63"));
}

#[test]
fn boot_write_completes_in_place() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    ctx.enter_kernel(thread);
    let core = ctx.kernel.core_mut(0);
    core.live.pc = 0x700;
    core.live.file.write(REG_SR, nr::BOOT_WRITE);
    core.live.file.set_ret(1);
    core.live.file.write(2, 0x8000);
    core.live.file.write(3, 16);

    let resume = ctx.kernel.dispatch(0, TrapEvent::sysop(0x01)).unwrap();
    assert_eq!(resume, Resume::ReturnToTrap);
    assert_eq!(*ctx.boot.writes.lock().unwrap(), vec![(1, 0x8000, 16)]);

    let core = ctx.kernel.core(0);
    assert_eq!(core.live.file.ret(), 16);
    assert_eq!(core.live.pc, 0x702);
    // The fast path never touched the frame store.
    assert_eq!(ctx.kernel.thread(thread).unwrap().stack.depth(), 1);
}

#[test]
fn boot_read_returns_the_count() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    ctx.enter_kernel(thread);
    let core = ctx.kernel.core_mut(0);
    core.live.file.write(REG_SR, nr::BOOT_READ);
    core.live.file.set_ret(0);
    core.live.file.write(2, 0x9000);
    core.live.file.write(3, 64);

    ctx.kernel.dispatch(0, TrapEvent::sysop(0x01)).unwrap();
    assert_eq!(*ctx.boot.reads.lock().unwrap(), vec![(0, 0x9000, 64)]);
    assert_eq!(ctx.kernel.core(0).live.file.ret(), 64);
}

#[test]
fn boot_seek_echoes_the_offset() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    ctx.enter_kernel(thread);
    let core = ctx.kernel.core_mut(0);
    core.live.file.write(REG_SR, nr::BOOT_SEEK);
    core.live.file.set_ret(0);
    core.live.file.write(2, 512);
    core.live.file.write(3, 0);

    ctx.kernel.dispatch(0, TrapEvent::sysop(0x01)).unwrap();
    assert_eq!(*ctx.boot.seeks.lock().unwrap(), vec![(0, 512, 0)]);
    assert_eq!(ctx.kernel.core(0).live.file.ret(), 512);
}

#[test]
fn boot_exit_halts_the_core() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    ctx.enter_kernel(thread);
    let core = ctx.kernel.core_mut(0);
    core.live.file.write(REG_SR, nr::BOOT_EXIT);
    core.live.file.set_ret(42);

    let resume = ctx.kernel.dispatch(0, TrapEvent::sysop(0x01)).unwrap();
    assert_eq!(resume, Resume::Idle);
    assert_eq!(*ctx.boot.exited.lock().unwrap(), Some(42));
}

// ══════════════════════════════════════════════════════════
// 4. Bounced operations
// ══════════════════════════════════════════════════════════

#[test]
fn bounced_operation_is_routed_to_the_fault_collaborator() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    ctx.kernel.core_mut(0).live.pc = 0x500;

    // Tag 0x03 is not a syscall; the hardware could not execute it.
    let resume = ctx.kernel.dispatch(0, TrapEvent::sysop(0x0203)).unwrap();
    assert_eq!(
        resume,
        Resume::DispatchTo {
            entry: HandlerEntry::Fault {
                addr: VirtAddr::new(0x500),
                cause: TrapCause::SysOp,
            },
            args: [0x500, 0x0203],
        }
    );
    assert!(ctx.kernel.thread(thread).unwrap().in_fault);
    assert_eq!(ctx.kernel.thread(thread).unwrap().stack.depth(), 1);

    ctx.kernel.service(0, resume).unwrap();
    assert_eq!(
        *ctx.vm.calls.lock().unwrap(),
        vec![(VirtAddr::new(0x500), TrapCause::SysOp)]
    );
    let t = ctx.kernel.thread(thread).unwrap();
    assert!(!t.in_fault);
    assert!(t.stack.is_empty());
    assert_eq!(ctx.kernel.core(0).live.pc, 0x500);
}

#[test]
fn bounced_operation_inside_fault_handling_is_fatal() {
    let mut ctx = TestContext::new();
    let (_, thread) = ctx.boot_thread(0);
    ctx.kernel.thread_mut(thread).unwrap().in_fault = true;

    let err = ctx.kernel.dispatch(0, TrapEvent::sysop(0x0203)).unwrap_err();
    assert!(err.reason.contains("bounced operation"));
}
