//! Mock interrupt controller.
//!
//! Acknowledge outcomes are scripted as a queue: each `acknowledge` call pops
//! the next outcome, and an empty queue reads as `NoSource` (the natural end
//! of a claim loop). Doorbell behavior is controlled by a not-ready budget
//! and an invalid flag.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mk32_kernel::traits::{AckOutcome, DoorbellOutcome, InterruptController};

/// Shared, inspectable state of the mock controller.
#[derive(Default)]
pub struct ControllerState {
    /// Scripted outcomes, popped per `acknowledge` call.
    pub acks: Mutex<VecDeque<AckOutcome>>,
    /// Every `acknowledge` call as (core, enable).
    pub ack_log: Mutex<Vec<(usize, bool)>>,
    /// Every delivered doorbell destination, in order.
    pub doorbells: Mutex<Vec<usize>>,
    /// Number of `NotReady` responses before doorbells start landing.
    pub not_ready_budget: Mutex<u32>,
    /// When set, every doorbell destination is reported invalid.
    pub invalid: AtomicBool,
}

impl ControllerState {
    /// Scripts the next acknowledge outcomes, in order.
    pub fn script_acks(&self, outcomes: impl IntoIterator<Item = AckOutcome>) {
        self.acks.lock().unwrap().extend(outcomes);
    }
}

/// The controller handle given to the kernel.
pub struct MockController(pub Arc<ControllerState>);

impl InterruptController for MockController {
    fn acknowledge(&mut self, core: usize, enable: bool) -> AckOutcome {
        self.0.ack_log.lock().unwrap().push((core, enable));
        self.0
            .acks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(AckOutcome::NoSource)
    }

    fn target(&mut self, dest: usize) -> DoorbellOutcome {
        if self.0.invalid.load(Ordering::SeqCst) {
            return DoorbellOutcome::Invalid;
        }
        let mut budget = self.0.not_ready_budget.lock().unwrap();
        if *budget > 0 {
            *budget -= 1;
            return DoorbellOutcome::NotReady;
        }
        self.0.doorbells.lock().unwrap().push(dest);
        DoorbellOutcome::Delivered(dest)
    }
}
