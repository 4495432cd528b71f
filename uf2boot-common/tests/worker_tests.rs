// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the worker loop.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use common::{FakePlatform, Storage};
use critical_section::CriticalSection;
use uf2boot_common::engine::{Config, Engine};
use uf2boot_common::memory::SRAM_BASE;
use uf2boot_common::platform::Platform;
use uf2boot_common::task::{ExclusiveMode, Status, Task, TaskSource};
use uf2boot_common::worker::Worker;

static CALLBACKS: AtomicU32 = AtomicU32::new(0);

fn counting_callback(
    _cs: CriticalSection<'_>,
    _engine: &Engine<'_>,
    task: &Task,
    platform: &mut dyn Platform,
) {
    CALLBACKS.fetch_add(1, Ordering::SeqCst);
    platform.async_complete(task);
}

fn write(source: TaskSource, token: u32) -> Task {
    Task::write(source, token, SRAM_BASE, &[token as u8; 4]).unwrap()
}

// --- Polling ---

#[test]
fn test_poll_empty_returns_false() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());
    assert!(!worker.poll());
}

#[test]
fn test_virtual_disk_before_control() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    engine.control_queue().enqueue(write(TaskSource::Control, 1));
    engine.vd_queue().enqueue(write(TaskSource::VirtualDisk, 2));

    assert!(worker.poll());
    assert_eq!(worker.platform().ram_writes[0].1, vec![2; 4]);
    assert!(worker.poll());
    assert_eq!(worker.platform().ram_writes[1].1, vec![1; 4]);
    assert!(!worker.poll());
}

#[test]
fn test_one_task_per_poll() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    engine.control_queue().enqueue(write(TaskSource::Control, 1));
    engine.vd_queue().enqueue(write(TaskSource::VirtualDisk, 2));
    worker.poll();

    assert_eq!(worker.platform().ram_writes.len(), 1);
    assert!(engine.control_queue().is_full());
}

// --- Completion ---

#[test]
fn test_callback_sees_result() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    let before = CALLBACKS.load(Ordering::SeqCst);
    engine
        .control_queue()
        .enqueue(write(TaskSource::Control, 5).with_callback(counting_callback));
    worker.poll();

    assert!(CALLBACKS.load(Ordering::SeqCst) > before);
    let done = worker.platform().completed[0];
    assert_eq!(done.token, 5);
    assert_eq!(done.result, Some(Status::Ok));
}

#[test]
fn test_task_without_callback_completes_silently() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    engine.control_queue().enqueue(write(TaskSource::Control, 1));
    worker.poll();
    assert_eq!(worker.platform().ram_writes.len(), 1);
    assert!(worker.platform().completed.is_empty());
}

#[test]
fn test_disabled_mailbox_short_circuits() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    engine
        .vd_queue()
        .enqueue(write(TaskSource::VirtualDisk, 3).with_callback(counting_callback));
    engine.vd_queue().disable(ExclusiveMode::Exclusive);
    assert!(worker.poll());

    assert!(worker.platform().memory_untouched());
    assert_eq!(worker.platform().completed[0].result, Some(Status::Disabled));
}

#[test]
fn test_disabling_disk_does_not_block_control() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    engine.vd_queue().disable(ExclusiveMode::Exclusive);
    engine
        .control_queue()
        .enqueue(write(TaskSource::Control, 4).with_callback(counting_callback));
    worker.poll();
    assert_eq!(worker.platform().completed[0].result, Some(Status::Ok));
}

#[test]
fn test_exclusive_task_through_worker() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    engine.control_queue().enqueue(Task::exclusive(
        TaskSource::Control,
        1,
        ExclusiveMode::ExclusiveAndEject,
    ));
    worker.poll();
    assert!(engine.vd_queue().is_disabled());
    assert_eq!(worker.platform().ejects, 1);
}

#[test]
fn test_executor_state_persists_across_polls() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    engine.vd_queue().enqueue(write(TaskSource::VirtualDisk, 1));
    worker.poll();
    engine.control_queue().enqueue(
        write(TaskSource::Control, 2)
            .with_check_interleave()
            .with_callback(counting_callback),
    );
    worker.poll();

    assert_eq!(
        worker.platform().completed[0].result,
        Some(Status::InterleavedWrite)
    );
    assert_eq!(
        worker.executor().last_mutation_source(),
        Some(TaskSource::VirtualDisk)
    );
}
