// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Hardware seam used by the executor and completion callbacks.
//!
//! The executor validates every address against the region table before
//! calling into the platform, so implementations may assume the ranges they
//! receive are in bounds.

use crate::task::Task;

/// One flash mutation, performed inside a single XIP-exit window.
///
/// Addresses are absolute (XIP-mapped). When both are present the erase
/// happens first.
#[derive(Clone, Copy, Debug)]
pub struct FlashOp<'a> {
    pub erase: Option<(u32, u32)>,
    pub program: Option<(u32, &'a [u8])>,
}

/// Where to go after the watchdog fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RebootRequest {
    /// Entry point, or 0 for the normal flash boot path.
    pub pc: u32,
    /// Initial stack pointer when `pc` is non-zero.
    pub sp: u32,
    pub delay_ms: u32,
}

pub trait Platform {
    /// Copy `buf.len()` bytes starting at `addr` (RAM, ROM or flash).
    fn read_memory(&mut self, addr: u32, buf: &mut [u8]);

    /// Copy `data` to RAM at `addr`.
    fn write_ram(&mut self, addr: u32, data: &[u8]);

    /// Erase and/or program flash with execute-in-place suspended.
    fn flash_update(&mut self, op: &FlashOp<'_>);

    /// Call the code at `entry` on the worker stack.
    fn execute(&mut self, entry: u32);

    /// Detach the mass-storage device from the host.
    fn eject(&mut self);

    fn schedule_reboot(&mut self, request: RebootRequest);

    /// Hand a finished task back to whoever is waiting on its token.
    fn async_complete(&mut self, task: &Task);
}
