// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Core of the UF2 update engine.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables `std` support for host tools
//! - `embedded` feature: Wakes the worker with `sev` and logs through defmt

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate alloc;

#[macro_use]
mod fmt;

pub mod bitset;
pub mod control;
pub mod disk;
pub mod engine;
pub mod executor;
pub mod ingest;
pub mod mailbox;
pub mod memory;
pub mod platform;
pub mod protocol;
pub mod task;
pub mod uf2;
pub mod worker;

// Re-export commonly used types
pub use disk::{BlockDevice, SectorImage, VirtualDisk, SECTOR_SIZE};
pub use engine::{Config, Engine};
pub use executor::Executor;
pub use ingest::{TransferState, TransferStatus, Uf2Storage};
pub use mailbox::Mailbox;
pub use platform::{FlashOp, Platform, RebootRequest};
pub use protocol::{Command, Response};
pub use task::{ExclusiveMode, Status, Task, TaskSource};
pub use worker::Worker;
