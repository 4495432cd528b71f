// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash erase/program using RP2040 ROM routines.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() and/or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash.
//! We use `#[link_section = ".data"]` to place the critical function in RAM,
//! and pre-resolve all ROM function pointers at init time.
//!
//! The XIP cache is kept disabled in update mode: its 16K of SRAM holds the
//! flash transfer bitsets.

use uf2boot_common::memory::{FLASH_BASE, FLASH_SECTOR_SIZE};
use uf2boot_common::platform::FlashOp;

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// 4K sector erase command, used with a FLASH_SECTOR_SIZE block size.
const SECTOR_ERASE_CMD: u8 = 0x20;

const XIP_CTRL_BASE: u32 = 0x1400_0000;
/// Atomic bit-clear alias of XIP_CTRL.CTRL.
const XIP_CTRL_CLR: *mut u32 = (XIP_CTRL_BASE + 0x3000) as *mut u32;
const XIP_CTRL_EN: u32 = 1 << 0;

/// ROM function pointers, resolved once at init from the ROM table.
/// Stored in static RAM so the RAM-resident update can call them without
/// accessing flash-based code.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Initialize ROM flash function pointers. Must be called once before any flash operations.
/// This performs ROM table lookups which require XIP to be active.
pub fn init() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE =
            core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// Turn the XIP cache off so its SRAM can be used as plain memory.
pub fn disable_xip_cache() {
    unsafe { XIP_CTRL_CLR.write_volatile(XIP_CTRL_EN) };
}

/// Convert an absolute XIP flash address to a flash-relative offset.
pub fn addr_to_offset(abs_addr: u32) -> u32 {
    abs_addr - FLASH_BASE
}

/// Apply one erase/program operation. Ranges were validated by the executor.
pub fn update(op: &FlashOp<'_>) {
    let (erase_offset, erase_len) = op
        .erase
        .map(|(addr, len)| (addr_to_offset(addr), len))
        .unwrap_or((0, 0));
    let (program_offset, data, len) = match op.program {
        Some((addr, data)) => (addr_to_offset(addr), data.as_ptr(), data.len()),
        None => (0, core::ptr::null(), 0),
    };
    unsafe { update_in_ram(erase_offset, erase_len, program_offset, data, len) }
}

/// Erase then program with XIP torn down, in a single interrupt-free window.
///
/// # Safety
/// The `init()` function must have been called first, and `data` must point
/// to `len` readable bytes outside flash.
#[link_section = ".data"]
#[inline(never)]
unsafe fn update_in_ram(
    erase_offset: u32,
    erase_len: u32,
    program_offset: u32,
    data: *const u8,
    len: usize,
) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    if erase_len != 0 {
        ROM_FLASH_RANGE_ERASE(
            erase_offset,
            erase_len as usize,
            FLASH_SECTOR_SIZE,
            SECTOR_ERASE_CMD,
        );
    }
    if len != 0 {
        ROM_FLASH_RANGE_PROGRAM(program_offset, data, len);
    }
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    // flash_flush_cache re-enables the cache.
    XIP_CTRL_CLR.write_volatile(XIP_CTRL_EN);
    cortex_m::interrupt::enable();
}
