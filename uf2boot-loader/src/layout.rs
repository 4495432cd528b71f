// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Memory layout as seen by the update engine. Must agree with memory.x.

use uf2boot_common::engine::{Config, REBOOT_DELAY_MS};
use uf2boot_common::memory::{
    MemoryRegion, RegionKind, FLASH_BASE, FLASH_WINDOW_SIZE, ROM_REGION, SRAM_BASE, SRAM_END,
};
use uf2boot_common::uf2::RP2040_FAMILY_ID;

/// Flash reserved for boot2 and the loader itself.
pub const LOADER_FLASH_SIZE: u32 = 64 * 1024;
/// Vector table of the application image.
pub const APP_BASE: u32 = FLASH_BASE + LOADER_FLASH_SIZE;
pub const APP_FLASH_SIZE: u32 = FLASH_WINDOW_SIZE - LOADER_FLASH_SIZE;

/// SRAM below the loader's own RAM, available to RAM images.
pub const IMAGE_SRAM_SIZE: u32 = 0x3_0000;

/// The loader's flash is readable but never writable. XIP SRAM is left out
/// entirely: it holds the flash transfer bitsets.
pub static REGIONS: [MemoryRegion; 4] = [
    ROM_REGION,
    MemoryRegion::new(RegionKind::Rom, FLASH_BASE, LOADER_FLASH_SIZE),
    MemoryRegion::new(RegionKind::Flash, APP_BASE, APP_FLASH_SIZE),
    MemoryRegion::new(RegionKind::Ram, SRAM_BASE, IMAGE_SRAM_SIZE),
];

pub fn config() -> Config<'static> {
    Config {
        family_id: RP2040_FAMILY_ID,
        regions: &REGIONS,
        reboot_delay_ms: REBOOT_DELAY_MS,
        ram_image_sp: SRAM_END,
    }
}

pub fn is_app_flash(addr: u32) -> bool {
    REGIONS[2].contains(addr)
}

pub fn is_sram(addr: u32) -> bool {
    (SRAM_BASE..=SRAM_END).contains(&addr)
}
