// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for control channel command handling.

mod common;

use common::{image_sector, FakePlatform, Storage};
use uf2boot_common::control::{build_task, completion_response, handle, status, Outcome};
use uf2boot_common::engine::{Config, Engine};
use uf2boot_common::ingest::TransferState;
use uf2boot_common::memory::{FLASH_BASE, SRAM_BASE};
use uf2boot_common::platform::RebootRequest;
use uf2boot_common::protocol::{Command, Response};
use uf2boot_common::task::{Direction, Effects, ExclusiveMode, Status, Task, TaskSource};
use uf2boot_common::worker::Worker;

// --- build_task ---

#[test]
fn test_read_task() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let task = build_task(&engine, &Command::Read { addr: 0x100, len: 64 }, 9).unwrap();
    assert_eq!(task.effects(), Effects::READ);
    assert_eq!(task.source, TaskSource::Control);
    assert_eq!(task.token, 9);
    assert_eq!(task.data_length, 64);
    assert!(task.callback.is_some());
}

#[test]
fn test_oversized_read_is_rejected() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let err = build_task(&engine, &Command::Read { addr: 0, len: 1024 }, 1).unwrap_err();
    assert_eq!(err, Status::InvalidTransferLength);
}

#[test]
fn test_ram_write_checks_interleave() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let cmd = Command::write(SRAM_BASE, &[1, 2, 3]).unwrap();
    let task = build_task(&engine, &cmd, 1).unwrap();
    assert_eq!(task.effects(), Effects::WRITE | Effects::CHECK_INTERLEAVE);
    assert_eq!(task.payload(), &[1, 2, 3]);
}

#[test]
fn test_flash_write_exits_xip() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let cmd = Command::write(FLASH_BASE + 0x100, &[0; 256]).unwrap();
    let task = build_task(&engine, &cmd, 1).unwrap();
    assert!(task.effects().contains(Effects::WRITE | Effects::EXIT_XIP));
}

#[test]
fn test_exclusive_holder_skips_interleave_check() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    engine.vd_queue().disable(ExclusiveMode::Exclusive);

    let cmd = Command::FlashErase {
        addr: FLASH_BASE,
        len: 4096,
    };
    let task = build_task(&engine, &cmd, 1).unwrap();
    assert_eq!(task.effects(), Effects::FLASH_ERASE | Effects::EXIT_XIP);
}

#[test]
fn test_exec_and_exclusive_tasks() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let exec = build_task(&engine, &Command::Exec { addr: SRAM_BASE }, 1).unwrap();
    assert_eq!(exec.effects(), Effects::EXECUTE);
    assert_eq!(exec.transfer_addr, SRAM_BASE);

    let cmd = Command::ExclusiveAccess {
        mode: ExclusiveMode::ExclusiveAndEject,
    };
    let excl = build_task(&engine, &cmd, 2).unwrap();
    assert_eq!(excl.effects(), Effects::EXCLUSIVE_ACCESS);
    assert_eq!(excl.exclusive, Some(ExclusiveMode::ExclusiveAndEject));
}

#[test]
fn test_non_task_commands_are_rejected() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    assert!(build_task(&engine, &Command::GetStatus, 1).is_err());
    let reboot = Command::Reboot {
        pc: 0,
        sp: 0,
        delay_ms: 10,
    };
    assert!(build_task(&engine, &reboot, 1).is_err());
}

// --- handle ---

#[test]
fn test_get_status_replies_immediately() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    match handle(&engine, &Command::GetStatus, 1) {
        Outcome::Reply(Response::Status {
            transfer,
            exclusive,
            rebooting,
        }) => {
            assert_eq!(transfer.state, TransferState::Idle);
            assert_eq!(exclusive, None);
            assert!(!rebooting);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_write_is_queued_and_completed() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    let cmd = Command::write(SRAM_BASE, &[7; 8]).unwrap();
    assert_eq!(handle(&engine, &cmd, 42), Outcome::Pending);
    assert!(engine.control_queue().is_full());

    worker.poll();
    let done = worker.platform().completed[0];
    assert_eq!(
        completion_response(&done),
        Response::Ack {
            token: 42,
            status: Status::Ok
        }
    );
}

#[test]
fn test_read_completion_carries_data() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    handle(&engine, &Command::Read { addr: 0x10, len: 4 }, 3);
    worker.poll();

    let response = completion_response(&worker.platform().completed[0]);
    assert_eq!(response, Response::data(3, Status::Ok, &[0x10, 0x11, 0x12, 0x13]));
    assert_eq!(response.completion(), Some((3, Status::Ok)));
}

#[test]
fn test_invalid_command_is_acked_with_error() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let outcome = handle(&engine, &Command::Read { addr: 0, len: 4096 }, 8);
    assert_eq!(
        outcome,
        Outcome::Reply(Response::Ack {
            token: 8,
            status: Status::InvalidTransferLength
        })
    );
    assert!(!engine.control_queue().is_full());
}

#[test]
fn test_reboot_latches_engine() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let cmd = Command::Reboot {
        pc: SRAM_BASE,
        sp: 0x2004_2000,
        delay_ms: 100,
    };
    assert_eq!(
        handle(&engine, &cmd, 1),
        Outcome::Reboot(RebootRequest {
            pc: SRAM_BASE,
            sp: 0x2004_2000,
            delay_ms: 100,
        })
    );
    assert!(engine.is_rebooting());
}

#[test]
fn test_write_sector_feeds_virtual_disk() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    let mut worker = Worker::new(&engine, FakePlatform::new());

    let sector = image_sector(SRAM_BASE, 0, 2);
    let cmd = Command::write_sector(5, &sector).unwrap();
    assert_eq!(handle(&engine, &cmd, 11), Outcome::Pending);
    assert!(engine.vd_queue().is_full());

    worker.poll();
    assert_eq!(engine.transfer_status().valid_block_count, 1);
    assert_eq!(
        completion_response(&worker.platform().completed[0]),
        Response::Ack {
            token: 11,
            status: Status::Ok
        }
    );
}

#[test]
fn test_plain_sector_is_acked_without_task() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let cmd = Command::write_sector(0, &[0u8; 512]).unwrap();
    assert_eq!(
        handle(&engine, &cmd, 2),
        Outcome::Reply(Response::Ack {
            token: 2,
            status: Status::Ok
        })
    );
}

#[test]
fn test_short_sector_is_rejected() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());

    let cmd = Command::write_sector(0, &[0u8; 100]).unwrap();
    assert_eq!(
        handle(&engine, &cmd, 2),
        Outcome::Reply(Response::Ack {
            token: 2,
            status: Status::InvalidTransferLength
        })
    );
}

#[test]
fn test_status_reports_exclusive_mode() {
    let mut storage = Storage::new();
    let engine = Engine::new(Config::rp2040(), storage.uf2());
    engine.vd_queue().disable(ExclusiveMode::ExclusiveAndEject);

    match status(&engine) {
        Response::Status { exclusive, .. } => {
            assert_eq!(exclusive, Some(ExclusiveMode::ExclusiveAndEject))
        }
        other => panic!("unexpected response {:?}", other),
    }
}

#[test]
fn test_unrun_task_reports_disabled() {
    let task = Task::read(TaskSource::Control, 1, 0, 4).unwrap();
    assert_eq!(task.transfer, Some(Direction::Read));
    assert_eq!(
        completion_response(&task).completion(),
        Some((1, Status::Disabled))
    );
}
