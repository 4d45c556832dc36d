//! The per-core trap dispatcher and the kernel aggregate it runs inside.
//!
//! Every transition from unprivileged to privileged execution arrives here
//! through one entry point per core: [`Kernel::dispatch`]. The dispatcher
//! reads the hardware-delivered cause, performs the minimal necessary work,
//! and produces a [`Resume`] continuation:
//!
//! * **Fast path** (`ReturnToTrap`): fill-engine installs, syscall
//!   fast-rejection, bootstrap hypercalls, and the context switch itself all
//!   resume without touching the register-frame store.
//! * **Slow path** (`DispatchTo`): a full frame is pushed on the current
//!   thread's privileged stack and control transfers to an external
//!   collaborator, which later completes through [`Kernel::ret_from_syscall`]
//!   or [`Kernel::ret_from_exception`] — each pops exactly one frame.
//! * **Idle**: the core halts until the next interrupt.
//!
//! Traps the recorded masking state says were impossible, recursive fault
//! entry, frame-store corruption, and invalid privileged call numbers are all
//! protocol violations: dispatch returns a [`Fatal`] and the caller halts the
//! core.

use tracing::{debug, error, warn};

use crate::common::constants::{nr, ASID_USER_BIT, ENOSYS, SYSOP_WIDTH};
use crate::common::{Fatal, KernelError, VirtAddr};
use crate::config::Config;
use crate::cpu::{switch_context, CoreState, SwitchError, ThreadId, ThreadTable, NO_THREAD};
use crate::frame::FrameKind;
use crate::mm::{fill, FillOutcome, SpaceId, SpaceTable};
use crate::smp::{bringup, ipi, FlushQueues, FlushRequest, IpiBoard, IpiKind, IpiStats};
use crate::traits::{
    AckOutcome, BootIo, ClockEvents, FaultResolution, FaultResolver, InterruptController,
    IrqDispatch,
};

use super::cause::{TrapCause, TrapEvent};
use super::resume::{HandlerEntry, Resume};

/// The external subsystems the dispatcher delegates to.
pub struct Collaborators {
    /// Generic VM fault handler.
    pub vm: Box<dyn FaultResolver>,
    /// Clock-event subsystem.
    pub clock: Box<dyn ClockEvents>,
    /// Generic interrupt dispatch layer.
    pub irq: Box<dyn IrqDispatch>,
    /// Interrupt controller.
    pub ctrl: Box<dyn InterruptController>,
    /// Boot I/O channel.
    pub boot: Box<dyn BootIo>,
}

/// The trap/VM subsystem: per-core state, threads, address spaces, and the
/// cross-core channels, behind the one dispatch entry point.
pub struct Kernel {
    config: Config,
    cores: Vec<CoreState>,
    threads: ThreadTable,
    spaces: SpaceTable,
    ipi: IpiBoard,
    flushes: FlushQueues,
    colls: Collaborators,
}

impl Kernel {
    /// Builds the subsystem for the configured machine.
    pub fn new(config: Config, colls: Collaborators) -> Self {
        let n = config.smp.num_cores;
        Self {
            cores: (0..n)
                .map(|id| CoreState::new(id, config.mmu.tlb_entries))
                .collect(),
            threads: ThreadTable::new(),
            spaces: SpaceTable::new(n),
            ipi: IpiBoard::new(n),
            flushes: FlushQueues::new(n),
            config,
            colls,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of cores.
    pub fn num_cores(&self) -> usize {
        self.cores.len()
    }

    /// State block of one core.
    pub fn core(&self, id: usize) -> &CoreState {
        &self.cores[id]
    }

    /// State block of one core, mutably.
    pub fn core_mut(&mut self, id: usize) -> &mut CoreState {
        &mut self.cores[id]
    }

    /// Creates a new, empty address space.
    pub fn create_space(&mut self) -> SpaceId {
        self.spaces.create()
    }

    /// Looks up an address space.
    pub fn space(&self, id: SpaceId) -> Option<&crate::mm::AddressSpace> {
        self.spaces.get(id)
    }

    /// Looks up an address space, mutably.
    pub fn space_mut(&mut self, id: SpaceId) -> Option<&mut crate::mm::AddressSpace> {
        self.spaces.get_mut(id)
    }

    /// Creates a thread in `space` with a configured-size privileged stack.
    pub fn spawn_thread(&mut self, space: SpaceId) -> ThreadId {
        self.threads.spawn(space, self.config.stack_size.bytes())
    }

    /// Looks up a thread.
    pub fn thread(&self, id: ThreadId) -> Option<&crate::cpu::Thread> {
        self.threads.get(id)
    }

    /// Looks up a thread, mutably.
    pub fn thread_mut(&mut self, id: ThreadId) -> Option<&mut crate::cpu::Thread> {
        self.threads.get_mut(id)
    }

    /// Boot wiring: binds `thread` as the current thread of `core` and
    /// activates its address space there, exactly as the context-switch
    /// primitive would.
    ///
    /// # Errors
    ///
    /// [`SwitchError`] for an unknown thread or address space, or when the
    /// core has no MMU-context id left to hand out.
    pub fn bind(&mut self, core: usize, thread: ThreadId) -> Result<(), SwitchError> {
        let Some(t) = self.threads.get_mut(thread) else {
            return Err(SwitchError::UnknownThread(thread));
        };
        let core_state = &mut self.cores[core];
        let space = self
            .spaces
            .get_mut(t.space)
            .ok_or(SwitchError::UnknownSpace(t.space))?;
        let asid = space
            .activate(core_state.id(), &mut core_state.asids)
            .ok_or(SwitchError::NoContext)?;
        t.last_core = Some(core);
        core_state.hw_asid =
            u32::from(asid) | if t.in_user() { ASID_USER_BIT } else { 0 };
        core_state.current = thread;
        Ok(())
    }

    /// Dispatches one trap taken on `core_id`.
    ///
    /// # Arguments
    ///
    /// * `core_id` - The core the trap was taken on.
    /// * `event` - The hardware-delivered cause/detail/address triple.
    ///
    /// # Returns
    ///
    /// The continuation for the trapped core, or a [`Fatal`] protocol
    /// violation after which the core must halt.
    ///
    /// # Errors
    ///
    /// See the module documentation for the fatal conditions.
    pub fn dispatch(&mut self, core_id: usize, event: TrapEvent) -> Result<Resume, Fatal> {
        let cause = event.cause;
        self.cores[core_id].stats.record(cause);

        if !self.cores[core_id].online {
            // A parked core reacts only to its doorbell; it acknowledges
            // without re-enabling and goes back to halt.
            if cause == TrapCause::ExternalInterrupt {
                self.colls.ctrl.acknowledge(core_id, false);
                return Ok(Resume::Idle);
            }
            return Err(self.cores[core_id].fatal(format!("{cause} trap on offline core"), None));
        }

        let is_async = matches!(
            cause,
            TrapCause::ExternalInterrupt | TrapCause::TimerTick | TrapCause::Preempt
        );
        if is_async && self.cores[core_id].irqs_masked {
            let stack = self
                .threads
                .get(self.cores[core_id].current)
                .map(|t| &t.stack);
            return Err(self.cores[core_id].fatal(format!("{cause} while interrupts masked"), stack));
        }

        match cause {
            TrapCause::SysOp => self.dispatch_sysop(core_id, event),
            TrapCause::ReadFault
            | TrapCause::WriteFault
            | TrapCause::ExecFault
            | TrapCause::AlignFault => self.dispatch_fault(core_id, event),
            TrapCause::ExternalInterrupt => self.dispatch_irq(core_id, event),
            TrapCause::TimerTick => {
                let work = self.colls.clock.timer_tick(core_id);
                if work {
                    self.cores[core_id].need_resched = true;
                }
                if self.cores[core_id].need_resched {
                    self.to_pending_work(core_id, event)
                } else {
                    Ok(Resume::ReturnToTrap)
                }
            }
            TrapCause::Preempt => {
                let current = self.cores[core_id].current;
                let Some(thread) = self.threads.get(current) else {
                    return Err(self.cores[core_id].fatal("no current thread", None));
                };
                if !thread.preemptible {
                    debug!(core = core_id, thread = current, "preempt while disabled");
                    return Ok(Resume::Idle);
                }
                self.cores[core_id].need_resched = true;
                self.to_pending_work(core_id, event)
            }
        }
    }

    fn dispatch_sysop(&mut self, core_id: usize, event: TrapEvent) -> Result<Resume, Fatal> {
        let op = event.opcode;
        let current = self.cores[core_id].current;
        let Some(thread) = self.threads.get(current) else {
            return Err(self.cores[core_id].fatal("no current thread", None));
        };
        let user = thread.in_user();

        if !op.is_syscall() {
            // An operation the hardware bounced to software. Routed to the
            // fault collaborator with the saved PC as the fault address; in
            // kernel mode that is a fault-handler excursion and recursion
            // applies.
            if thread.in_fault {
                return Err(self
                    .cores[core_id]
                    .fatal("bounced operation inside fault handling", Some(&thread.stack)));
            }
            let live = self.cores[core_id].live;
            let Some(thread) = self.threads.get_mut(current) else {
                return Err(self.cores[core_id].fatal("no current thread", None));
            };
            if let Err(e) = thread
                .stack
                .push(FrameKind::Full, TrapCause::SysOp, op, &live)
            {
                return Err(self
                    .cores[core_id]
                    .fatal(format!("frame push: {e}"), Some(&thread.stack)));
            }
            thread.in_fault = true;
            debug!(core = core_id, opcode = %op, "bounced operation delegated");
            return Ok(Resume::DispatchTo {
                entry: HandlerEntry::Fault {
                    addr: VirtAddr::new(live.pc),
                    cause: TrapCause::SysOp,
                },
                args: [live.pc, op.raw()],
            });
        }

        let nr = self.cores[core_id].live.file.sr();
        if user {
            if nr >= nr::SYSCALLS || (nr::INTERNAL_START..=nr::INTERNAL_END).contains(&nr) {
                // Fast rejection: deliver -ENOSYS to the trapped context and
                // step past the opcode, never touching the frame store.
                let core = &mut self.cores[core_id];
                core.stats.rejected_syscalls += 1;
                core.live.file.set_ret(0u32.wrapping_sub(ENOSYS));
                core.live.pc = core.live.pc.wrapping_add(SYSOP_WIDTH);
                debug!(core = core_id, nr, "invalid syscall rejected");
                return Ok(Resume::ReturnToTrap);
            }
            let live = self.cores[core_id].live;
            let arg = live.file.ret();
            let Some(thread) = self.threads.get_mut(current) else {
                return Err(self.cores[core_id].fatal("no current thread", None));
            };
            if let Err(e) = thread
                .stack
                .push(FrameKind::Full, TrapCause::SysOp, op, &live)
            {
                return Err(self
                    .cores[core_id]
                    .fatal(format!("frame push: {e}"), Some(&thread.stack)));
            }
            self.cores[core_id].stats.syscalls += 1;
            return Ok(Resume::DispatchTo {
                entry: HandlerEntry::Syscall { nr },
                args: [nr, arg],
            });
        }

        // Privileged callers reach only the internal calls; anything else
        // here means kernel code is broken.
        let live = self.cores[core_id].live;
        match nr {
            nr::SWITCH => {
                let raw_prev = live.file.ret();
                let next = live.file.read(2);
                let prev = (raw_prev != NO_THREAD).then_some(raw_prev);
                if let Err(e) = switch_context(
                    &mut self.cores[core_id],
                    &mut self.threads,
                    &mut self.spaces,
                    prev,
                    next,
                    op,
                ) {
                    return Err(self.cores[core_id].fatal(format!("context switch: {e}"), None));
                }
                debug!(core = core_id, ?prev, next, "context switch");
                Ok(Resume::ReturnToTrap)
            }
            nr::BOOT_WRITE => {
                let ret = self
                    .colls
                    .boot
                    .write(live.file.ret(), live.file.read(2), live.file.read(3));
                self.complete_fast_call(core_id, ret);
                Ok(Resume::ReturnToTrap)
            }
            nr::BOOT_READ => {
                let ret = self
                    .colls
                    .boot
                    .read(live.file.ret(), live.file.read(2), live.file.read(3));
                self.complete_fast_call(core_id, ret);
                Ok(Resume::ReturnToTrap)
            }
            nr::BOOT_SEEK => {
                let ret = self
                    .colls
                    .boot
                    .seek(live.file.ret(), live.file.read(2), live.file.read(3));
                self.complete_fast_call(core_id, ret);
                Ok(Resume::ReturnToTrap)
            }
            nr::BOOT_EXIT => {
                self.colls.boot.exit(live.file.ret());
                Ok(Resume::Idle)
            }
            _ => Err(self.cores[core_id].fatal(
                format!("invalid privileged syscall number {nr}"),
                Some(&thread.stack),
            )),
        }
    }

    /// Writes a fast-path call's return value and steps past the opcode.
    fn complete_fast_call(&mut self, core_id: usize, ret: u32) {
        let core = &mut self.cores[core_id];
        core.live.file.set_ret(ret);
        core.live.pc = core.live.pc.wrapping_add(SYSOP_WIDTH);
    }

    fn dispatch_fault(&mut self, core_id: usize, event: TrapEvent) -> Result<Resume, Fatal> {
        let cause = event.cause;
        let current = self.cores[core_id].current;
        let Some(thread) = self.threads.get(current) else {
            return Err(self.cores[core_id].fatal("no current thread", None));
        };
        let user = thread.in_user();

        if thread.in_fault {
            return Err(self.cores[core_id].fatal(
                format!("recursive {cause} at {}", event.fault_addr),
                Some(&thread.stack),
            ));
        }

        if !self.config.mmu.hw_walker {
            if let Some(access) = cause.access() {
                let Some(space) = self.spaces.get(thread.space) else {
                    return Err(self
                        .cores[core_id]
                        .fatal(format!("unknown address space {}", thread.space), None));
                };
                let core = &mut self.cores[core_id];
                let asid = core.active_asid();
                match fill(
                    &mut core.tlb,
                    &space.table,
                    asid,
                    event.fault_addr,
                    access,
                    user,
                ) {
                    FillOutcome::Installed => {
                        core.stats.fast_fills += 1;
                        return Ok(Resume::ReturnToTrap);
                    }
                    FillOutcome::UnexpectedHit => {
                        return Err(core.fatal(
                            format!("{cause} at {} despite valid translation", event.fault_addr),
                            Some(&thread.stack),
                        ));
                    }
                    FillOutcome::Escalate => {}
                }
            }
        }

        // Genuine page fault, protection violation, or alignment fault:
        // delegate to the VM collaborator.
        let live = self.cores[core_id].live;
        let Some(thread) = self.threads.get_mut(current) else {
            return Err(self.cores[core_id].fatal("no current thread", None));
        };
        if let Err(e) = thread
            .stack
            .push(FrameKind::Full, cause, event.opcode, &live)
        {
            return Err(self
                .cores[core_id]
                .fatal(format!("frame push: {e}"), Some(&thread.stack)));
        }
        thread.in_fault = true;
        let core = &mut self.cores[core_id];
        core.stats.slow_faults += 1;
        debug!(core = core_id, %cause, addr = %event.fault_addr, "fault delegated");
        Ok(Resume::DispatchTo {
            entry: HandlerEntry::Fault {
                addr: event.fault_addr,
                cause,
            },
            args: [event.fault_addr.val(), cause.to_raw()],
        })
    }

    fn dispatch_irq(&mut self, core_id: usize, event: TrapEvent) -> Result<Resume, Fatal> {
        let mut work = false;
        let mut stop = false;
        loop {
            match self.colls.ctrl.acknowledge(core_id, true) {
                AckOutcome::Source(src) => {
                    work |= self.colls.irq.dispatch(core_id, src);
                }
                AckOutcome::InterCore => {
                    for kind in self.ipi.drain(core_id) {
                        match kind {
                            IpiKind::Reschedule => work = true,
                            IpiKind::CallFunc => {
                                let core = &mut self.cores[core_id];
                                self.flushes.apply(core_id, &mut core.tlb, &mut core.asids);
                            }
                            IpiKind::Stop => stop = true,
                            IpiKind::StartAck => {
                                debug!(core = core_id, "secondary start acknowledged");
                            }
                        }
                    }
                }
                AckOutcome::NoSource => break,
            }
        }

        if stop {
            let core = &mut self.cores[core_id];
            core.online = false;
            core.tlb.flush_all();
            debug!(core = core_id, "core stopped");
            return Ok(Resume::Idle);
        }
        if work {
            self.cores[core_id].need_resched = true;
        }
        if self.cores[core_id].need_resched {
            self.to_pending_work(core_id, event)
        } else {
            Ok(Resume::ReturnToTrap)
        }
    }

    /// Pushes a full frame and hands control to pending-work processing.
    fn to_pending_work(&mut self, core_id: usize, event: TrapEvent) -> Result<Resume, Fatal> {
        let current = self.cores[core_id].current;
        let live = self.cores[core_id].live;
        let Some(thread) = self.threads.get_mut(current) else {
            return Err(self.cores[core_id].fatal("no current thread", None));
        };
        if let Err(e) = thread
            .stack
            .push(FrameKind::Full, event.cause, event.opcode, &live)
        {
            return Err(self
                .cores[core_id]
                .fatal(format!("frame push: {e}"), Some(&thread.stack)));
        }
        self.cores[core_id].need_resched = false;
        Ok(Resume::DispatchTo {
            entry: HandlerEntry::PendingWork,
            args: [0, 0],
        })
    }

    /// Completes a dispatched syscall: pops one frame, restores it, writes
    /// the return value, and resumes past the trapping opcode.
    ///
    /// # Errors
    ///
    /// [`Fatal`] on frame-store underflow or corruption.
    pub fn ret_from_syscall(&mut self, core_id: usize, retval: u32) -> Result<(), Fatal> {
        let current = self.cores[core_id].current;
        let Some(thread) = self.threads.get_mut(current) else {
            return Err(self.cores[core_id].fatal("no current thread", None));
        };
        let frame = match thread.stack.pop() {
            Ok(f) => f,
            Err(e) => {
                return Err(self
                    .cores[core_id]
                    .fatal(format!("syscall return: {e}"), Some(&thread.stack)));
            }
        };
        let to_user = thread.in_user();
        let core = &mut self.cores[core_id];
        frame.restore_into(&mut core.live);
        core.live.file.set_ret(retval);
        core.live.pc = frame.pc().wrapping_add(SYSOP_WIDTH);
        core.hw_asid = u32::from(core.active_asid()) | if to_user { ASID_USER_BIT } else { 0 };
        Ok(())
    }

    /// Completes a delegated fault or pending-work excursion: pops one frame
    /// and restores the trapped context exactly, retrying the interrupted
    /// operation.
    ///
    /// # Errors
    ///
    /// [`Fatal`] on frame-store underflow or corruption.
    pub fn ret_from_exception(&mut self, core_id: usize) -> Result<(), Fatal> {
        let current = self.cores[core_id].current;
        let Some(thread) = self.threads.get_mut(current) else {
            return Err(self.cores[core_id].fatal("no current thread", None));
        };
        let frame = match thread.stack.pop() {
            Ok(f) => f,
            Err(e) => {
                return Err(self
                    .cores[core_id]
                    .fatal(format!("exception return: {e}"), Some(&thread.stack)));
            }
        };
        thread.in_fault = false;
        let to_user = thread.in_user();
        let core = &mut self.cores[core_id];
        frame.restore_into(&mut core.live);
        core.live.file.set_ret(frame.ret());
        core.live.pc = frame.pc();
        core.hw_asid = u32::from(core.active_asid()) | if to_user { ASID_USER_BIT } else { 0 };
        Ok(())
    }

    /// Runs the collaborator a `DispatchTo` continuation names and performs
    /// its completion.
    ///
    /// Syscall-table entries are not run here: the syscall layer is external
    /// and completes through [`Kernel::ret_from_syscall`] itself.
    ///
    /// # Errors
    ///
    /// [`Fatal`] from the completion's frame pop.
    pub fn service(&mut self, core_id: usize, resume: Resume) -> Result<(), Fatal> {
        match resume {
            Resume::ReturnToTrap | Resume::Idle | Resume::DispatchTo {
                entry: HandlerEntry::Syscall { .. },
                ..
            } => Ok(()),
            Resume::DispatchTo {
                entry: HandlerEntry::Fault { addr, cause },
                ..
            } => match self.colls.vm.resolve_fault(addr, cause) {
                FaultResolution::Resolved | FaultResolution::ResolvedFatal => {
                    self.ret_from_exception(core_id)
                }
                FaultResolution::Deferred => Ok(()),
            },
            Resume::DispatchTo {
                entry: HandlerEntry::PendingWork,
                ..
            } => self.ret_from_exception(core_id),
        }
    }

    /// Posts one signal to `dest` and rings its doorbell.
    ///
    /// # Errors
    ///
    /// The doorbell failures from [`ipi::send`]; the local core is unaffected.
    pub fn send_ipi(&mut self, dest: usize, kind: IpiKind) -> Result<(), KernelError> {
        ipi::send(
            &self.ipi,
            self.colls.ctrl.as_mut(),
            dest,
            kind,
            self.config.smp.ipi_timeout_ms,
        )
    }

    /// Delivery statistics of one core's mailbox.
    pub fn ipi_stats(&self, core: usize) -> IpiStats {
        self.ipi.stats(core)
    }

    /// Wakes a parked secondary core.
    ///
    /// # Errors
    ///
    /// [`KernelError::InvalidTarget`] for a nonexistent core, plus the
    /// doorbell failures.
    pub fn start_core(&mut self, dest: usize) -> Result<(), KernelError> {
        if dest >= self.cores.len() {
            return Err(KernelError::InvalidTarget { core: dest });
        }
        bringup::wake(
            self.colls.ctrl.as_mut(),
            dest,
            self.config.smp.ipi_timeout_ms,
        )
    }

    /// Entry point run by a woken secondary: marks it online and
    /// acknowledges bring-up to `boot_core`.
    ///
    /// # Errors
    ///
    /// The doorbell failures from the acknowledge signal.
    pub fn secondary_start(&mut self, core: usize, boot_core: usize) -> Result<(), KernelError> {
        self.cores[core].online = true;
        debug!(core, "secondary online");
        self.send_ipi(boot_core, IpiKind::StartAck)
    }

    /// Waits for `core` to come online, under the configured timeout.
    ///
    /// # Errors
    ///
    /// [`KernelError::StartupTimeout`] when the deadline expires; logged, and
    /// the waiting core is unaffected.
    pub fn wait_core_online(&self, core: usize) -> Result<(), KernelError> {
        let timeout = self.config.smp.ipi_timeout_ms;
        if bringup::wait_for(timeout, || self.cores[core].online) {
            Ok(())
        } else {
            error!(core, timeout, "secondary did not come online");
            Err(KernelError::StartupTimeout { core })
        }
    }

    /// Asks `dest` to go offline.
    ///
    /// # Errors
    ///
    /// The doorbell failures from the stop signal.
    pub fn stop_core(&mut self, dest: usize) -> Result<(), KernelError> {
        self.send_ipi(dest, IpiKind::Stop)
    }

    /// Broadcasts a range invalidation to every core where `space` is active.
    ///
    /// # Errors
    ///
    /// The first doorbell failure encountered; remaining targets are still
    /// signaled first.
    pub fn flush_space_range(
        &mut self,
        space: SpaceId,
        start: VirtAddr,
        end: VirtAddr,
    ) -> Result<(), KernelError> {
        let Some(sp) = self.spaces.get(space) else {
            warn!(space, "range flush for unknown address space");
            return Ok(());
        };
        let targets: Vec<(usize, u16)> = (0..self.cores.len())
            .filter_map(|c| sp.asid_on(c).map(|a| (c, a)))
            .collect();
        let mut first_err = None;
        for (core, asid) in targets {
            self.flushes
                .push(core, FlushRequest::Range { asid, start, end });
            if let Err(e) = self.send_ipi(core, IpiKind::CallFunc) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Tears down an address space, retiring its ASID on every core that
    /// ever ran it.
    ///
    /// # Errors
    ///
    /// The first doorbell failure encountered; remaining targets are still
    /// signaled first.
    pub fn destroy_space(&mut self, space: SpaceId) -> Result<(), KernelError> {
        let Some(bindings) = self.spaces.destroy(space) else {
            warn!(space, "teardown of unknown address space");
            return Ok(());
        };
        let mut first_err = None;
        for (core, asid) in bindings {
            self.flushes.push(core, FlushRequest::Retire { asid });
            if let Err(e) = self.send_ipi(core, IpiKind::CallFunc) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
