//! Threads and the thread table.
//!
//! A thread here is only what the trap layer needs: an identity, the address
//! space it executes in, its privileged stack, and where it last ran. All
//! scheduling state beyond that belongs to the external scheduler.

use crate::frame::PrivStack;
use crate::mm::SpaceId;

/// Identifier of a thread.
pub type ThreadId = u32;

/// Sentinel thread id meaning "no thread" (used by the context-switch call
/// when the outgoing context is discarded).
pub const NO_THREAD: ThreadId = u32::MAX;

/// One thread of execution, as the trap layer sees it.
#[derive(Debug)]
pub struct Thread {
    id: ThreadId,
    /// The address space the thread executes in.
    pub space: SpaceId,
    /// The thread's privileged stack.
    pub stack: PrivStack,
    /// True while a delegated fault is in flight for this thread; a second
    /// fault entering dispatch while set is a protocol violation. Travels
    /// with the thread across context switches.
    pub in_fault: bool,
    /// Core the thread last ran on; `None` until its first run.
    pub last_core: Option<usize>,
    /// Whether voluntary preemption is currently permitted for this thread.
    pub preemptible: bool,
}

impl Thread {
    /// This thread's identifier.
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// True when the thread is currently in unprivileged execution.
    ///
    /// Decided by privileged-stack emptiness: a thread's outermost frame is
    /// its original entry into privileged mode, so an empty stack means the
    /// live context is user code.
    pub fn in_user(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Table of live threads.
#[derive(Debug, Default)]
pub struct ThreadTable {
    threads: Vec<Option<Thread>>,
}

impl ThreadTable {
    /// Creates an empty thread table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a thread in `space` with a fresh privileged stack.
    pub fn spawn(&mut self, space: SpaceId, stack_size: u32) -> ThreadId {
        let make = |id: ThreadId| Thread {
            id,
            space,
            stack: PrivStack::new(stack_size),
            in_fault: false,
            last_core: None,
            preemptible: true,
        };
        if let Some(idx) = self.threads.iter().position(Option::is_none) {
            let id = idx as ThreadId;
            self.threads[idx] = Some(make(id));
            return id;
        }
        let id = self.threads.len() as ThreadId;
        self.threads.push(Some(make(id)));
        id
    }

    /// Looks up a thread by id.
    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(id as usize).and_then(Option::as_ref)
    }

    /// Looks up a thread by id, mutably.
    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.get_mut(id as usize).and_then(Option::as_mut)
    }

    /// Removes a thread.
    pub fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        self.threads.get_mut(id as usize).and_then(Option::take)
    }
}
