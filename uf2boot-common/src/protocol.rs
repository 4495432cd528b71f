// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Control channel messages between the host tool and the device.
//!
//! This module provides types that work in both `no_std` (embedded) and `std` (host) environments.
//! Byte payloads are `heapless::Vec` on the device and `Vec` on the host;
//! postcard encodes both the same way.

#[cfg(feature = "std")]
extern crate alloc;

use serde::{Deserialize, Serialize};

use crate::disk::SECTOR_SIZE;
use crate::ingest::TransferStatus;
use crate::task::{ExclusiveMode, Status, TASK_DATA_SIZE};

/// Largest `Write` / `Read` payload.
pub const MAX_TRANSFER_SIZE: usize = TASK_DATA_SIZE;

/// Largest COBS frame either side will send, with headroom for the
/// postcard header and COBS overhead on a `WriteSector`.
pub const MAX_FRAME_SIZE: usize = 1024;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)] // no_std, no allocator for Box
pub enum Command {
    GetStatus,
    ExclusiveAccess {
        mode: ExclusiveMode,
    },
    Read {
        addr: u32,
        len: u32,
    },
    #[cfg(not(feature = "std"))]
    Write {
        addr: u32,
        data: heapless::Vec<u8, MAX_TRANSFER_SIZE>,
    },
    #[cfg(feature = "std")]
    Write {
        addr: u32,
        data: alloc::vec::Vec<u8>,
    },
    FlashErase {
        addr: u32,
        len: u32,
    },
    Exec {
        addr: u32,
    },
    /// Reboot through the watchdog; `pc == 0` takes the normal boot path.
    Reboot {
        pc: u32,
        sp: u32,
        delay_ms: u32,
    },
    /// One mass-storage sector, handled as if written over the virtual disk.
    #[cfg(not(feature = "std"))]
    WriteSector {
        lba: u32,
        data: heapless::Vec<u8, SECTOR_SIZE>,
    },
    #[cfg(feature = "std")]
    WriteSector {
        lba: u32,
        data: alloc::vec::Vec<u8>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ack {
        token: u32,
        status: Status,
    },
    #[cfg(not(feature = "std"))]
    Data {
        token: u32,
        status: Status,
        data: heapless::Vec<u8, MAX_TRANSFER_SIZE>,
    },
    #[cfg(feature = "std")]
    Data {
        token: u32,
        status: Status,
        data: alloc::vec::Vec<u8>,
    },
    Status {
        transfer: TransferStatus,
        exclusive: Option<ExclusiveMode>,
        rebooting: bool,
    },
}

impl Command {
    /// Build a `Write`, or `None` if `data` exceeds [`MAX_TRANSFER_SIZE`].
    pub fn write(addr: u32, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_TRANSFER_SIZE {
            return None;
        }
        Some(Command::Write {
            addr,
            data: bytes(data)?,
        })
    }

    /// Build a `WriteSector`, or `None` if `data` exceeds [`SECTOR_SIZE`].
    pub fn write_sector(lba: u32, data: &[u8]) -> Option<Self> {
        if data.len() > SECTOR_SIZE {
            return None;
        }
        Some(Command::WriteSector {
            lba,
            data: bytes(data)?,
        })
    }
}

impl Response {
    /// `Data` response carrying up to [`MAX_TRANSFER_SIZE`] bytes of `data`.
    pub fn data(token: u32, status: Status, data: &[u8]) -> Self {
        let len = data.len().min(MAX_TRANSFER_SIZE);
        Response::Data {
            token,
            status,
            data: bytes(&data[..len]).unwrap_or_default(),
        }
    }

    /// Token and status of a task completion; `None` for `Status`.
    pub fn completion(&self) -> Option<(u32, Status)> {
        match self {
            Response::Ack { token, status } | Response::Data { token, status, .. } => {
                Some((*token, *status))
            }
            Response::Status { .. } => None,
        }
    }
}

#[cfg(not(feature = "std"))]
fn bytes<const N: usize>(data: &[u8]) -> Option<heapless::Vec<u8, N>> {
    heapless::Vec::from_slice(data).ok()
}

#[cfg(feature = "std")]
fn bytes(data: &[u8]) -> Option<alloc::vec::Vec<u8>> {
    Some(data.to_vec())
}
