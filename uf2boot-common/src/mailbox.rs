// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Single-slot task handoff between interrupt producers and the worker.
//!
//! The slot is guarded by interrupt masking only: `enqueue` runs in the USB
//! interrupt, `dequeue` on the worker, and neither may block. A second
//! enqueue before the worker has drained the slot replaces the pending
//! task (last write wins) and is logged.

use core::cell::RefCell;
use core::sync::atomic::{fence, Ordering};

use critical_section::Mutex;

use crate::task::{ExclusiveMode, Task};

struct Slot {
    task: Option<Task>,
    disabled: Option<ExclusiveMode>,
}

pub struct Mailbox {
    name: &'static str,
    slot: Mutex<RefCell<Slot>>,
}

impl Mailbox {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(RefCell::new(Slot {
                task: None,
                disabled: None,
            })),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queue `task`, returning the task it displaced if the slot was full.
    ///
    /// The task's result must still be unset.
    pub fn enqueue(&self, task: Task) -> Option<Task> {
        debug_assert!(task.result.is_none(), "queued task already has a result");
        let displaced = critical_section::with(|cs| {
            self.slot.borrow_ref_mut(cs).task.replace(task)
        });
        if displaced.is_some() {
            warn!("overwriting already queued task for mailbox {}", self.name);
        }
        signal_worker();
        displaced
    }

    /// Take the pending task, if any.
    pub fn dequeue(&self) -> Option<Task> {
        critical_section::with(|cs| {
            fence(Ordering::Acquire);
            self.slot.borrow_ref_mut(cs).task.take()
        })
    }

    pub fn is_full(&self) -> bool {
        critical_section::with(|cs| self.slot.borrow_ref(cs).task.is_some())
    }

    /// Fence the mailbox off: tasks run after this complete with
    /// `Status::Disabled`. `ExclusiveMode::Shared` re-enables it.
    pub fn disable(&self, mode: ExclusiveMode) {
        critical_section::with(|cs| {
            self.slot.borrow_ref_mut(cs).disabled = mode.is_exclusive().then_some(mode);
        });
    }

    pub fn enable(&self) {
        self.disable(ExclusiveMode::Shared);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_mode().is_some()
    }

    pub fn disabled_mode(&self) -> Option<ExclusiveMode> {
        critical_section::with(|cs| self.slot.borrow_ref(cs).disabled)
    }
}

/// Wake a worker sleeping in `wfe`.
fn signal_worker() {
    #[cfg(feature = "embedded")]
    cortex_m::asm::sev();
}
