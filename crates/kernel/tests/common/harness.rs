use std::sync::Arc;

use mk32_kernel::common::{LiveRegs, PhysAddr, VirtAddr};
use mk32_kernel::config::Config;
use mk32_kernel::cpu::ThreadId;
use mk32_kernel::frame::FrameKind;
use mk32_kernel::mm::{Pte, SpaceId};
use mk32_kernel::trap::cause::{SysOpcode, TrapCause};
use mk32_kernel::{Collaborators, Kernel};

use super::mocks::{
    BootState, ClockState, ControllerState, IrqState, MockBoot, MockClock, MockController,
    MockIrq, MockVm, VmState,
};

/// A kernel wired to mock collaborators, plus handles to inspect them.
pub struct TestContext {
    pub kernel: Kernel,
    pub ctrl: Arc<ControllerState>,
    pub vm: Arc<VmState>,
    pub clock: Arc<ClockState>,
    pub irq: Arc<IrqState>,
    pub boot: Arc<BootState>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// A context for an `n`-core machine with a short cross-core timeout so
    /// failure paths stay fast under test.
    pub fn with_cores(n: usize) -> Self {
        let mut config = Config::default();
        config.smp.num_cores = n;
        config.smp.ipi_timeout_ms = 50;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let ctrl = Arc::new(ControllerState::default());
        let vm = Arc::new(VmState::default());
        let clock = Arc::new(ClockState::default());
        let irq = Arc::new(IrqState::default());
        let boot = Arc::new(BootState::default());

        let colls = Collaborators {
            vm: Box::new(MockVm(vm.clone())),
            clock: Box::new(MockClock(clock.clone())),
            irq: Box::new(MockIrq(irq.clone())),
            ctrl: Box::new(MockController(ctrl.clone())),
            boot: Box::new(MockBoot(boot.clone())),
        };

        Self {
            kernel: Kernel::new(config, colls),
            ctrl,
            vm,
            clock,
            irq,
            boot,
        }
    }

    /// Creates a fresh address space with one thread, bound as `core`'s
    /// current thread. The thread starts with an empty privileged stack,
    /// i.e. in unprivileged execution.
    pub fn boot_thread(&mut self, core: usize) -> (SpaceId, ThreadId) {
        let space = self.kernel.create_space();
        let thread = self.kernel.spawn_thread(space);
        self.kernel.bind(core, thread).expect("boot binding succeeds");
        (space, thread)
    }

    /// Maps one page in `space` with the given permissions (cached).
    pub fn map_page(&mut self, space: SpaceId, va: u32, pa: u32, r: bool, w: bool, x: bool, user: bool) {
        let pte = Pte::leaf(PhysAddr::new(pa), r, w, x, user, true);
        self.kernel
            .space_mut(space)
            .expect("space exists")
            .table
            .map(VirtAddr::new(va), pte);
    }

    /// Pushes an outermost frame on `thread`'s privileged stack, so the
    /// thread reads as executing privileged code.
    pub fn enter_kernel(&mut self, thread: ThreadId) {
        let live = LiveRegs::default();
        self.kernel
            .thread_mut(thread)
            .expect("thread exists")
            .stack
            .push(FrameKind::Full, TrapCause::SysOp, SysOpcode(0x01), &live)
            .expect("outermost frame fits");
    }
}
