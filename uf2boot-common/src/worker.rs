// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The worker loop: drain mailboxes, run tasks, fire completions.

use crate::engine::Engine;
use crate::executor::Executor;
use crate::mailbox::Mailbox;
use crate::platform::Platform;
use crate::task::{Status, Task};

pub struct Worker<'e, 'a, P: Platform> {
    engine: &'e Engine<'a>,
    executor: Executor,
    platform: P,
}

impl<'e, 'a, P: Platform> Worker<'e, 'a, P> {
    pub fn new(engine: &'e Engine<'a>, platform: P) -> Self {
        Self {
            engine,
            executor: Executor::new(),
            platform,
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Run at most one task. The virtual-disk mailbox is always drained
    /// before the control mailbox. Returns false if both were empty.
    pub fn poll(&mut self) -> bool {
        let engine = self.engine;
        for queue in [engine.vd_queue(), engine.control_queue()] {
            if let Some(task) = queue.dequeue() {
                self.run_task(queue, task);
                return true;
            }
        }
        false
    }

    /// Poll forever, calling `idle` (typically `wfe`) whenever there was
    /// nothing to do.
    pub fn run(&mut self, mut idle: impl FnMut()) -> ! {
        loop {
            if !self.poll() {
                idle();
            }
        }
    }

    fn run_task(&mut self, queue: &Mailbox, mut task: Task) {
        let status = if queue.is_disabled() {
            debug!("{} mailbox disabled, dropping task {}", queue.name(), task.token);
            Status::Disabled
        } else {
            self.executor
                .execute(self.engine, &mut self.platform, &mut task)
        };
        task.result = Some(status);

        if let Some(callback) = task.callback {
            let engine = self.engine;
            let platform: &mut dyn Platform = &mut self.platform;
            critical_section::with(|cs| callback(cs, engine, &task, platform));
        }
    }
}
