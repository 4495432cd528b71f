// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Control channel command handling.
//!
//! Runs in the USB interrupt. Commands that touch memory become tasks on
//! the control mailbox and are answered when the worker completes them;
//! the rest are answered immediately.

use critical_section::CriticalSection;

use crate::disk::SECTOR_SIZE;
use crate::engine::Engine;
use crate::memory::{find_region_of, RegionKind};
use crate::platform::{Platform, RebootRequest};
use crate::protocol::{Command, Response};
use crate::task::{Direction, Status, Task, TaskSource};

/// What the transport should do after handing a command to [`handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Answer now.
    Reply(Response),
    /// The answer arrives through `Platform::async_complete`.
    Pending,
    /// Acknowledge, then start the watchdog reboot.
    Reboot(RebootRequest),
}

/// Map a memory command to a control-mailbox task.
///
/// Length limits are enforced here, so an oversized request never produces
/// a task. Commands answered without a task (`GetStatus`, `Reboot`,
/// `WriteSector`) are rejected with `InvalidTransferLength`.
pub fn build_task(engine: &Engine<'_>, command: &Command, token: u32) -> Result<Task, Status> {
    let source = TaskSource::Control;
    let task = match command {
        Command::ExclusiveAccess { mode } => Task::exclusive(source, token, *mode),
        Command::Exec { addr } => Task::execute(source, token, *addr),
        Command::Read { addr, len } => Task::read(source, token, *addr, *len)?,
        Command::Write { addr, data } => {
            let task = Task::write(source, token, *addr, &data[..])?;
            mutation(engine, task, *addr, data.len() as u32)
        }
        Command::FlashErase { addr, len } => {
            let task = Task::flash_erase(source, token, *addr, *len);
            mutation(engine, task, *addr, *len)
        }
        Command::GetStatus | Command::Reboot { .. } | Command::WriteSector { .. } => {
            return Err(Status::InvalidTransferLength)
        }
    };
    Ok(task.with_callback(complete))
}

/// ExitXIP for flash targets; CheckInterleave unless the host holds
/// exclusive access.
fn mutation(engine: &Engine<'_>, mut task: Task, addr: u32, len: u32) -> Task {
    if find_region_of(engine.config().regions, RegionKind::Flash, addr, len).is_some() {
        task = task.with_exit_xip();
    }
    if !engine.vd_queue().is_disabled() {
        task = task.with_check_interleave();
    }
    task
}

/// Dispatch one decoded command.
pub fn handle(engine: &Engine<'_>, command: &Command, token: u32) -> Outcome {
    match command {
        Command::GetStatus => Outcome::Reply(status(engine)),
        Command::Reboot { pc, sp, delay_ms } => {
            engine.latch_reboot();
            Outcome::Reboot(RebootRequest {
                pc: *pc,
                sp: *sp,
                delay_ms: *delay_ms,
            })
        }
        Command::WriteSector { lba, data } => {
            let Ok(sector) = <&[u8; SECTOR_SIZE]>::try_from(&data[..]) else {
                return Outcome::Reply(Response::Ack {
                    token,
                    status: Status::InvalidTransferLength,
                });
            };
            if engine.vd_write_block(token, *lba, sector) {
                Outcome::Pending
            } else {
                Outcome::Reply(Response::Ack {
                    token,
                    status: Status::Ok,
                })
            }
        }
        _ => match build_task(engine, command, token) {
            Ok(task) => {
                engine.control_queue().enqueue(task);
                Outcome::Pending
            }
            Err(status) => Outcome::Reply(Response::Ack { token, status }),
        },
    }
}

pub fn status(engine: &Engine<'_>) -> Response {
    Response::Status {
        transfer: engine.transfer_status(),
        exclusive: engine.vd_queue().disabled_mode(),
        rebooting: engine.is_rebooting(),
    }
}

/// The response that reports a finished task. A task that never ran
/// reports `Disabled`.
pub fn completion_response(task: &Task) -> Response {
    let status = task.result.unwrap_or(Status::Disabled);
    match task.transfer {
        Some(Direction::Read) => Response::data(task.token, status, task.payload()),
        _ => Response::Ack {
            token: task.token,
            status,
        },
    }
}

/// Completion callback for control tasks.
pub(crate) fn complete(
    _cs: CriticalSection<'_>,
    _engine: &Engine<'_>,
    task: &Task,
    platform: &mut dyn Platform,
) {
    trace!("control task {} done: {:?}", task.token, task.result);
    platform.async_complete(task);
}
