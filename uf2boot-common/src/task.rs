// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Deferred privileged operations.
//!
//! A [`Task`] is built on the producer side (USB interrupt), copied by
//! value through a [`Mailbox`](crate::mailbox::Mailbox) and executed on the
//! worker. Its effects are independent sub-operations; the executor applies
//! them in a fixed order regardless of how the task was assembled.

use bitflags::bitflags;
use critical_section::CriticalSection;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::memory::FLASH_PAGE_SIZE;
use crate::platform::Platform;

/// Staging buffer size: one flash page.
pub const TASK_DATA_SIZE: usize = FLASH_PAGE_SIZE as usize;

/// Completion status reported for every executed task.
///
/// Serialized as its [`code`](Status::code) so the wire carries the same
/// number as the discriminant.
#[repr(u8)]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok = 0,
    /// The mailbox the task came from was disabled by an exclusive-access holder.
    Disabled = 1,
    InvalidTransferLength = 3,
    InvalidAddress = 4,
    BadAlignment = 5,
    InterleavedWrite = 6,
    Rebooting = 7,
}

impl Status {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Status::Ok),
            1 => Some(Status::Disabled),
            3 => Some(Status::InvalidTransferLength),
            4 => Some(Status::InvalidAddress),
            5 => Some(Status::BadAlignment),
            6 => Some(Status::InterleavedWrite),
            7 => Some(Status::Rebooting),
            _ => None,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// A status byte with no [`Status`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownStatus(pub u8);

impl core::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown status code {}", self.0)
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        status.code()
    }
}

impl TryFrom<u8> for Status {
    type Error = UnknownStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Status::from_code(code).ok_or(UnknownStatus(code))
    }
}

/// Logical writer a task is attributed to.
#[repr(u8)]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskSource {
    VirtualDisk = 1,
    Control = 2,
}

/// Exclusive-access request carried by an ExclusiveAccess task.
#[repr(u8)]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExclusiveMode {
    /// Give the virtual disk back.
    Shared = 0,
    Exclusive = 1,
    ExclusiveAndEject = 2,
}

impl ExclusiveMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ExclusiveMode::Shared),
            1 => Some(ExclusiveMode::Exclusive),
            2 => Some(ExclusiveMode::ExclusiveAndEject),
            _ => None,
        }
    }

    pub fn is_exclusive(self) -> bool {
        self != ExclusiveMode::Shared
    }
}

/// Direction of a memory transfer, seen from the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Copy `data` into target memory.
    Write,
    /// Copy target memory into `data`.
    Read,
}

/// Flash range to erase before any write of the same task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EraseRange {
    pub addr: u32,
    pub len: u32,
}

bitflags! {
    /// Flat view of a task's effects, for logs and assertions.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Effects: u8 {
        const EXCLUSIVE_ACCESS = 1 << 0;
        const EXECUTE = 1 << 1;
        const WRITE = 1 << 2;
        const READ = 1 << 3;
        const FLASH_ERASE = 1 << 4;
        const EXIT_XIP = 1 << 5;
        const CHECK_INTERLEAVE = 1 << 6;
    }
}

/// Completion handler.
///
/// Runs on the worker inside a critical section, so it must not block and
/// must not enqueue into the mailbox the task was drained from.
pub type TaskCallback = fn(CriticalSection<'_>, &Engine<'_>, &Task, &mut dyn Platform);

/// One deferred operation.
#[derive(Clone, Copy)]
pub struct Task {
    pub exclusive: Option<ExclusiveMode>,
    /// Call `transfer_addr` as a function.
    pub execute: bool,
    pub exit_xip: bool,
    pub erase: Option<EraseRange>,
    pub transfer: Option<Direction>,
    pub check_interleave: bool,
    pub transfer_addr: u32,
    pub data_length: u32,
    pub data: [u8; TASK_DATA_SIZE],
    pub source: TaskSource,
    pub token: u32,
    /// `None` until the worker has run the task.
    pub result: Option<Status>,
    pub callback: Option<TaskCallback>,
}

impl Task {
    /// A task with no effects.
    pub const fn new(source: TaskSource, token: u32) -> Self {
        Self {
            exclusive: None,
            execute: false,
            exit_xip: false,
            erase: None,
            transfer: None,
            check_interleave: false,
            transfer_addr: 0,
            data_length: 0,
            data: [0; TASK_DATA_SIZE],
            source,
            token,
            result: None,
            callback: None,
        }
    }

    /// Copy `data` to `addr`.
    pub fn write(source: TaskSource, token: u32, addr: u32, data: &[u8]) -> Result<Self, Status> {
        if data.len() > TASK_DATA_SIZE {
            return Err(Status::InvalidTransferLength);
        }
        let mut task = Self::new(source, token);
        task.transfer = Some(Direction::Write);
        task.transfer_addr = addr;
        task.data_length = data.len() as u32;
        task.data[..data.len()].copy_from_slice(data);
        Ok(task)
    }

    /// Copy `len` bytes from `addr` into the task's buffer.
    pub fn read(source: TaskSource, token: u32, addr: u32, len: u32) -> Result<Self, Status> {
        if len as usize > TASK_DATA_SIZE {
            return Err(Status::InvalidTransferLength);
        }
        let mut task = Self::new(source, token);
        task.transfer = Some(Direction::Read);
        task.transfer_addr = addr;
        task.data_length = len;
        Ok(task)
    }

    pub fn flash_erase(source: TaskSource, token: u32, addr: u32, len: u32) -> Self {
        let mut task = Self::new(source, token);
        task.erase = Some(EraseRange { addr, len });
        task.exit_xip = true;
        task
    }

    /// Call the code at `entry`. Never combined with other effects.
    pub fn execute(source: TaskSource, token: u32, entry: u32) -> Self {
        let mut task = Self::new(source, token);
        task.execute = true;
        task.transfer_addr = entry;
        task
    }

    pub fn exclusive(source: TaskSource, token: u32, mode: ExclusiveMode) -> Self {
        let mut task = Self::new(source, token);
        task.exclusive = Some(mode);
        task
    }

    pub fn with_exit_xip(mut self) -> Self {
        self.exit_xip = true;
        self
    }

    pub fn with_erase(mut self, range: EraseRange) -> Self {
        self.erase = Some(range);
        self
    }

    pub fn with_check_interleave(mut self) -> Self {
        self.check_interleave = true;
        self
    }

    pub fn with_callback(mut self, callback: TaskCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Whether the task changes flash or RAM contents.
    pub fn is_mutation(&self) -> bool {
        self.erase.is_some() || self.transfer == Some(Direction::Write)
    }

    /// The bytes carried by the task (write payload or read result).
    pub fn payload(&self) -> &[u8] {
        let len = (self.data_length as usize).min(TASK_DATA_SIZE);
        &self.data[..len]
    }

    pub fn effects(&self) -> Effects {
        let mut effects = Effects::empty();
        effects.set(Effects::EXCLUSIVE_ACCESS, self.exclusive.is_some());
        effects.set(Effects::EXECUTE, self.execute);
        effects.set(Effects::WRITE, self.transfer == Some(Direction::Write));
        effects.set(Effects::READ, self.transfer == Some(Direction::Read));
        effects.set(Effects::FLASH_ERASE, self.erase.is_some());
        effects.set(Effects::EXIT_XIP, self.exit_xip);
        effects.set(Effects::CHECK_INTERLEAVE, self.check_interleave);
        effects
    }
}

impl core::fmt::Debug for Task {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Task")
            .field("effects", &self.effects())
            .field("transfer_addr", &self.transfer_addr)
            .field("data_length", &self.data_length)
            .field("erase", &self.erase)
            .field("source", &self.source)
            .field("token", &self.token)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}
