// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Watchdog reboots and the scratch registers that survive them.
//!
//! The boot ROM checks scratch 4..7 after a watchdog reset: if scratch 4
//! holds the boot magic and scratch 5 its check value, it loads SP from
//! scratch 6 and jumps to scratch 7 instead of booting flash.

use uf2boot_common::platform::RebootRequest;

const WATCHDOG_BASE: u32 = 0x4005_8000;
const WATCHDOG_CTRL: *mut u32 = WATCHDOG_BASE as *mut u32;
const WATCHDOG_LOAD: *mut u32 = (WATCHDOG_BASE + 0x04) as *mut u32;
const WATCHDOG_SCRATCH0: *mut u32 = (WATCHDOG_BASE + 0x0C) as *mut u32;
const WATCHDOG_CTRL_ENABLE: u32 = 1 << 30;
/// LOAD is 24 bits wide.
const WATCHDOG_MAX_LOAD: u32 = 0x00FF_FFFF;
/// RP2040-E1: the counter decrements twice per tick.
const LOAD_PER_US: u32 = 2;

const PSM_WDSEL: *mut u32 = (0x4001_0000 + 0x08) as *mut u32;
const PSM_WDSEL_ALL: u32 = 0x0001_FFFF;
const PSM_WDSEL_ROSC: u32 = 1 << 0;
const PSM_WDSEL_XOSC: u32 = 1 << 1;

const BOOT_MAGIC: u32 = 0xB007_C0D3;

/// Written to scratch 0 by an application that wants update mode on the
/// next boot.
pub const UPDATE_REQUEST_MAGIC: u32 = 0x0FDA_7E00;

fn scratch(n: usize) -> *mut u32 {
    unsafe { WATCHDOG_SCRATCH0.add(n) }
}

/// Read and clear the update request left in scratch 0.
pub fn take_update_request() -> bool {
    unsafe {
        let value = scratch(0).read_volatile();
        scratch(0).write_volatile(0);
        value == UPDATE_REQUEST_MAGIC
    }
}

/// Arm the watchdog to reset the chip after `request.delay_ms`. With a
/// non-zero `pc` the boot ROM enters the image at `pc` with `request.sp`.
pub fn schedule_reboot(request: RebootRequest) {
    defmt::println!(
        "Reboot in {}ms (pc=0x{:08x}, sp=0x{:08x})",
        request.delay_ms,
        request.pc,
        request.sp
    );
    unsafe {
        WATCHDOG_CTRL.write_volatile(WATCHDOG_CTRL.read_volatile() & !WATCHDOG_CTRL_ENABLE);

        if request.pc != 0 {
            let pc = request.pc | 1;
            scratch(4).write_volatile(BOOT_MAGIC);
            scratch(5).write_volatile(pc ^ BOOT_MAGIC.wrapping_neg());
            scratch(6).write_volatile(request.sp);
            scratch(7).write_volatile(pc);
        } else {
            scratch(4).write_volatile(0);
        }

        // Reset everything but the oscillators.
        PSM_WDSEL.write_volatile(PSM_WDSEL_ALL & !(PSM_WDSEL_ROSC | PSM_WDSEL_XOSC));

        let load = request
            .delay_ms
            .saturating_mul(1000)
            .saturating_mul(LOAD_PER_US)
            .min(WATCHDOG_MAX_LOAD);
        WATCHDOG_LOAD.write_volatile(load);
        WATCHDOG_CTRL.write_volatile(WATCHDOG_CTRL.read_volatile() | WATCHDOG_CTRL_ENABLE);
    }
}
