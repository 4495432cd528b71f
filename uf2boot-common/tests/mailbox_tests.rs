// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the single-slot mailbox.

use uf2boot_common::mailbox::Mailbox;
use uf2boot_common::task::{ExclusiveMode, Task, TaskSource};

fn task(token: u32) -> Task {
    Task::new(TaskSource::Control, token)
}

// --- Single slot ---

#[test]
fn test_new_mailbox_is_empty() {
    let mailbox = Mailbox::new("test");
    assert!(!mailbox.is_full());
    assert!(mailbox.dequeue().is_none());
    assert_eq!(mailbox.name(), "test");
}

#[test]
fn test_enqueue_then_dequeue() {
    let mailbox = Mailbox::new("test");
    assert!(mailbox.enqueue(task(7)).is_none());
    assert!(mailbox.is_full());

    let got = mailbox.dequeue().unwrap();
    assert_eq!(got.token, 7);
    assert!(!mailbox.is_full());
}

#[test]
fn test_dequeue_after_dequeue_is_empty() {
    let mailbox = Mailbox::new("test");
    mailbox.enqueue(task(1));
    assert!(mailbox.dequeue().is_some());
    assert!(mailbox.dequeue().is_none());
    assert!(mailbox.dequeue().is_none());
}

#[test]
fn test_holds_at_most_one_task() {
    let mailbox = Mailbox::new("test");
    for token in 0..10 {
        mailbox.enqueue(task(token));
        if token % 3 == 0 {
            mailbox.dequeue();
        }
        // Draining twice never yields two tasks.
        let first = mailbox.dequeue();
        let second = mailbox.dequeue();
        assert!(!(first.is_some() && second.is_some()));
        assert!(second.is_none());
    }
}

#[test]
fn test_task_is_copied_by_value() {
    let mailbox = Mailbox::new("test");
    let mut original = Task::write(TaskSource::VirtualDisk, 3, 0x2000_0000, &[1, 2, 3]).unwrap();
    mailbox.enqueue(original);
    original.data[0] = 0xFF;

    let got = mailbox.dequeue().unwrap();
    assert_eq!(got.payload(), &[1, 2, 3]);
    assert_eq!(original.payload(), &[0xFF, 2, 3]);
}

// --- Overwrite on full ---

#[test]
fn test_enqueue_when_full_overwrites() {
    let mailbox = Mailbox::new("test");
    mailbox.enqueue(task(1));
    let displaced = mailbox.enqueue(task(2));

    assert_eq!(displaced.map(|t| t.token), Some(1));
    assert_eq!(mailbox.dequeue().map(|t| t.token), Some(2));
    assert!(mailbox.dequeue().is_none());
}

#[test]
fn test_repeated_overwrite_keeps_newest() {
    let mailbox = Mailbox::new("test");
    for token in 0..5 {
        mailbox.enqueue(task(token));
    }
    assert_eq!(mailbox.dequeue().map(|t| t.token), Some(4));
}

// --- Disable / enable ---

#[test]
fn test_disable_and_enable() {
    let mailbox = Mailbox::new("test");
    assert!(!mailbox.is_disabled());

    mailbox.disable(ExclusiveMode::ExclusiveAndEject);
    assert!(mailbox.is_disabled());
    assert_eq!(
        mailbox.disabled_mode(),
        Some(ExclusiveMode::ExclusiveAndEject)
    );

    mailbox.enable();
    assert!(!mailbox.is_disabled());
    assert_eq!(mailbox.disabled_mode(), None);
}

#[test]
fn test_disable_shared_reenables() {
    let mailbox = Mailbox::new("test");
    mailbox.disable(ExclusiveMode::Exclusive);
    mailbox.disable(ExclusiveMode::Shared);
    assert!(!mailbox.is_disabled());
}

#[test]
fn test_disabled_mailbox_still_accepts_tasks() {
    let mailbox = Mailbox::new("test");
    mailbox.disable(ExclusiveMode::Exclusive);
    mailbox.enqueue(task(9));
    assert_eq!(mailbox.dequeue().map(|t| t.token), Some(9));
}

#[test]
#[should_panic(expected = "already has a result")]
fn test_enqueue_rejects_completed_task() {
    let mailbox = Mailbox::new("test");
    let mut done = task(1);
    done.result = Some(uf2boot_common::Status::Ok);
    mailbox.enqueue(done);
}
